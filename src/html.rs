use maud::{DOCTYPE, Markup, PreEscaped, html};
use rust_decimal::Decimal;

use crate::product::Currency;

// Table styles
pub const TABLE_HEADER_STYLE: &str = "text-xs text-gray-700 uppercase \
    bg-gray-50 dark:bg-gray-700 dark:text-gray-400";

pub const TABLE_ROW_STYLE: &str = "bg-white border-b dark:bg-gray-800 dark:border-gray-700";

pub const TABLE_CELL_STYLE: &str = "px-6 py-4";

// Page container
pub const PAGE_CONTAINER_STYLE: &str =
    "flex flex-col items-center px-2 lg:px-6 lg:py-8 mx-auto max-w-screen-xl \
    text-gray-900 dark:text-white";

/// The ECharts build used by the dashboard charts.
pub const ECHARTS_SCRIPT: &str = "https://cdn.jsdelivr.net/npm/echarts@5.6.0/dist/echarts.min.js";

const TAILWIND_SCRIPT: &str = "https://cdn.tailwindcss.com";

pub enum HeadElement {
    /// The file path or URL to a JavaScript script.
    ScriptLink(String),
    /// JavaScript source code.
    ScriptSource(PreEscaped<String>),
}

pub fn base(title: &str, head_elements: &[HeadElement], content: &Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en"
        {
            head
            {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) " - Catalog" }
                script src=(TAILWIND_SCRIPT) {}

                @for element in head_elements
                {
                    @match element
                    {
                        HeadElement::ScriptSource(text) => script { (text) }
                        HeadElement::ScriptLink(path) => script src=(path) {}
                    }
                }
            }

            body class="container max-w-full min-h-screen bg-gray-50 dark:bg-gray-900"
            {
                (content)
            }
        }
    }
}

pub fn error_view(title: &str, header: &str, description: &str, fix: &str) -> Markup {
    // Template adapted from https://flowbite.com/blocks/marketing/404/
    let content = html!(
        section class="bg-white dark:bg-gray-900"
        {
            div class="py-8 px-4 mx-auto max-w-screen-xl lg:py-16 lg:px-6"
            {
                div class="mx-auto max-w-screen-sm text-center"
                {
                    h1
                        class="mb-4 text-7xl tracking-tight font-extrabold
                            lg:text-9xl text-blue-600 dark:text-blue-500"
                    {
                        (header)
                    }

                    p
                        class="mb-4 text-3xl md:text-4xl tracking-tight
                            font-bold text-gray-900 dark:text-white"
                    {
                        (description)
                    }

                    p
                        class="mb-4 text-1xl md:text-2xl tracking-tight
                            text-gray-900 dark:text-white"
                    {
                        (fix)
                    }

                    a
                        href="/"
                        class="inline-flex text-white bg-blue-600
                            hover:bg-blue-800 focus:ring-4 focus:outline-hidden
                            focus:ring-blue-300 font-medium rounded text-sm px-5
                            py-2.5 text-center dark:focus:ring-blue-900 my-4"
                    {
                        "Back to Homepage"
                    }
                }
            }
        }
    );

    base(title, &[], &content)
}

/// Format `amount` with two decimal places followed by the currency code, e.g. "19.99 USD".
pub fn format_price(amount: Decimal, currency: &Currency) -> String {
    format!("{} {currency}", format_amount(amount))
}

/// Format `amount` rounded to two decimal places, e.g. "1234.50".
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::product::Currency;

    use super::{format_amount, format_price};

    #[test]
    fn formats_amounts_with_two_decimal_places() {
        assert_eq!(format_amount(Decimal::new(12345, 1)), "1234.50");
        assert_eq!(format_amount(Decimal::ZERO), "0.00");
        assert_eq!(format_amount(Decimal::new(20, 0) / Decimal::from(3)), "6.67");
    }

    #[test]
    fn formats_price_with_currency() {
        assert_eq!(
            format_price(Decimal::new(999, 2), &Currency::new_unchecked("EUR")),
            "9.99 EUR"
        );
    }
}
