//! Chart generation and rendering for the dashboard.
//!
//! This module creates interactive ECharts visualizations of the catalog:
//! - **Products per Category**: bar chart over every category
//! - **Stock Distribution**: pie chart of in stock versus sold out products
//!
//! Each chart is generated as JSON configuration for the ECharts library and
//! rendered with corresponding HTML containers and JavaScript initialization code.

use charming::{
    Chart,
    component::{Axis, Grid, Legend, Title},
    element::{AxisPointer, AxisPointerType, AxisType, Tooltip, Trigger},
    series::{Bar, Pie},
};
use maud::{Markup, PreEscaped, html};

use crate::{
    dashboard::report::{CategoryCount, StockDistribution},
    html::HeadElement,
};

/// A dashboard chart with its HTML container ID and ECharts configuration.
pub(super) struct DashboardChart {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: &'static str,
    /// The ECharts configuration as a JSON string
    pub options: String,
}

/// Renders the HTML containers for dashboard charts.
pub(super) fn charts_view(charts: &[DashboardChart]) -> Markup {
    html!(
        section
            id="charts"
            class="w-full mx-auto mb-4"
        {
            div class="grid grid-cols-1 xl:grid-cols-2 gap-4"
            {
                @for chart in charts {
                    div
                        id=(chart.id)
                        class="min-h-[380px] rounded dark:bg-gray-100"
                    {}
                }
            }
        }
    )
}

/// Generates JavaScript initialization code for dashboard charts.
///
/// Creates scripts that initialize ECharts instances with dark mode support
/// and responsive resizing.
pub(super) fn charts_script(charts: &[DashboardChart]) -> HeadElement {
    let script_content = charts
        .iter()
        .map(|chart| {
            format!(
                r#"(function() {{
                    const chart = echarts.init(document.getElementById("{}"));
                    chart.setOption({});

                    window.addEventListener('resize', chart.resize);

                    const darkModeMediaQuery = window.matchMedia('(prefers-color-scheme: dark)');
                    const updateTheme = () => {{
                        chart.setTheme(darkModeMediaQuery.matches ? 'dark' : 'default');
                    }}
                    darkModeMediaQuery.addEventListener('change', updateTheme);
                    updateTheme();
                }})();"#,
                chart.id,
                escape_script_json(&chart.options)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let wrapped_script = format!(
        "document.addEventListener('DOMContentLoaded', function() {{\n{}\n}});",
        script_content
    );

    HeadElement::ScriptSource(PreEscaped(wrapped_script))
}

/// Escape `<` in JSON that is inlined into a `<script>` element, so text such
/// as a category named `</script>` cannot close the element early.
fn escape_script_json(json: &str) -> String {
    json.replace('<', "\\u003c")
}

pub(super) fn category_counts_chart(category_counts: &[CategoryCount]) -> Chart {
    let (labels, values): (Vec<String>, Vec<f64>) = category_counts
        .iter()
        .map(|entry| (entry.name.clone(), entry.count as f64))
        .unzip();

    Chart::new()
        .title(Title::new().text("Products per Category"))
        .tooltip(
            Tooltip::new()
                .trigger(Trigger::Axis)
                .axis_pointer(AxisPointer::new().type_(AxisPointerType::Shadow)),
        )
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(Axis::new().type_(AxisType::Value))
        .series(Bar::new().name("Products").data(values))
}

pub(super) fn stock_distribution_chart(distribution: StockDistribution) -> Chart {
    Chart::new()
        .title(Title::new().text("Stock Distribution"))
        .tooltip(Tooltip::new().trigger(Trigger::Item))
        .legend(Legend::new().bottom("3%"))
        .series(
            Pie::new()
                .name("Products")
                .radius(vec!["40%", "70%"])
                .data(vec![
                    (distribution.in_stock as f64, "In stock"),
                    (distribution.out_of_stock as f64, "Out of stock"),
                ]),
        )
}
