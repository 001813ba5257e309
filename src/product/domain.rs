//! Core product domain types.

use std::{fmt::Display, str::FromStr};

use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use time::OffsetDateTime;

use crate::{Error, category::CategoryId, database_id::DatabaseId};

/// Database identifier for a product.
pub type ProductId = DatabaseId;

/// A non-negative amount of money with at most two decimal places.
///
/// Stored as a whole number of cents so sums and comparisons are exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price {
    cents: i64,
}

impl Price {
    /// Prices must be strictly less than this many whole units.
    pub const UPPER_LIMIT: i64 = 100_000_000;

    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidPrice] if `amount` is negative, is not less than
    /// [Price::UPPER_LIMIT] or has more than two decimal places.
    pub fn new(amount: Decimal) -> Result<Self, Error> {
        if amount.is_sign_negative() && !amount.is_zero()
            || amount >= Decimal::from(Self::UPPER_LIMIT)
            || amount.round_dp(2) != amount
        {
            return Err(Error::InvalidPrice(amount));
        }

        let mut cents = amount;
        cents.rescale(2);

        // The checks above bound the mantissa to less than 10^10.
        Ok(Self {
            cents: cents.mantissa() as i64,
        })
    }

    /// Create a price from a whole number of cents.
    ///
    /// The caller should ensure that `cents` is not negative.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// The price in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// The price as a decimal with two decimal places.
    pub fn amount(&self) -> Decimal {
        Decimal::new(self.cents, 2)
    }
}

impl Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.amount())
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Serialize::serialize(&self.amount(), serializer)
    }
}

/// A three letter currency code such as "USD" or "NGN".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Currency(String);

impl Currency {
    /// Create a currency code, normalised to upper case.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidCurrency] if `code` is not exactly three ASCII letters.
    pub fn new(code: &str) -> Result<Self, Error> {
        let code = code.trim();

        if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(code.to_ascii_uppercase()))
        } else {
            Err(Error::InvalidCurrency(code.to_owned()))
        }
    }

    /// Create a currency code without validation.
    pub fn new_unchecked(code: &str) -> Self {
        Self(code.to_owned())
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self("USD".to_owned())
    }
}

impl AsRef<str> for Currency {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Currency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Currency::new(s)
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How many units of a product are in stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct StockQuantity(u32);

impl StockQuantity {
    /// Create a stock quantity.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidStockQuantity] if `quantity` is negative or does not fit in 32 bits.
    pub fn new(quantity: i64) -> Result<Self, Error> {
        u32::try_from(quantity)
            .map(Self)
            .map_err(|_| Error::InvalidStockQuantity(quantity))
    }

    /// The number of units.
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl From<u32> for StockQuantity {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// An item for sale in the catalog.
///
/// To create a new `Product`, use [Product::build].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    /// The ID of the product.
    pub id: ProductId,
    /// The display name of the product.
    pub name: String,
    /// A text description of the product.
    pub description: String,
    /// The unit price.
    pub price: Price,
    /// The currency `price` is in.
    pub currency: Currency,
    /// An optional link to a picture of the product.
    pub image_url: Option<String>,
    /// How many units are available.
    pub stock_quantity: StockQuantity,
    /// The category the product belongs to, if any.
    pub category_id: Option<CategoryId>,
    /// When the product was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the product was last changed.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Product {
    /// Create a new product.
    ///
    /// Shortcut for [ProductBuilder] for discoverability.
    pub fn build(name: &str, description: &str, price: Price) -> ProductBuilder {
        ProductBuilder {
            name: name.to_owned(),
            description: description.to_owned(),
            price,
            currency: Currency::default(),
            image_url: None,
            stock_quantity: StockQuantity::default(),
            category_id: None,
        }
    }
}

/// A builder for creating [Product] instances.
///
/// The currency defaults to USD, the stock quantity to zero, and the
/// product starts without an image or category.
#[derive(Debug, PartialEq, Clone)]
pub struct ProductBuilder {
    /// The display name, must not be empty.
    pub name: String,
    /// A text description of the product.
    pub description: String,
    /// The unit price.
    pub price: Price,
    /// The currency `price` is in.
    pub currency: Currency,
    /// An optional link to a picture of the product.
    pub image_url: Option<String>,
    /// How many units are available.
    pub stock_quantity: StockQuantity,
    /// The category to put the product in. Must refer to an existing category.
    pub category_id: Option<CategoryId>,
}

impl ProductBuilder {
    /// Set the currency.
    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    /// Set the image URL.
    pub fn image_url(mut self, image_url: Option<String>) -> Self {
        self.image_url = image_url;
        self
    }

    /// Set the stock quantity.
    pub fn stock_quantity(mut self, stock_quantity: StockQuantity) -> Self {
        self.stock_quantity = stock_quantity;
        self
    }

    /// Set the category.
    pub fn category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }
}

/// A partial update to a product.
///
/// Fields set to `None` are left unchanged. For `image_url`, `Some(None)`
/// removes the image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    /// The new name.
    pub name: Option<String>,
    /// The new description.
    pub description: Option<String>,
    /// The new price.
    pub price: Option<Price>,
    /// The new currency.
    pub currency: Option<Currency>,
    /// The new image URL.
    pub image_url: Option<Option<String>>,
    /// The new stock quantity.
    pub stock_quantity: Option<StockQuantity>,
    /// The new category. Must refer to an existing category.
    pub category_id: Option<CategoryId>,
}

/// Trim a product name and check that it is not empty.
pub(crate) fn validate_product_name(name: &str) -> Result<String, Error> {
    let name = name.trim();

    if name.is_empty() {
        Err(Error::EmptyProductName)
    } else {
        Ok(name.to_owned())
    }
}

#[cfg(test)]
mod price_tests {
    use rust_decimal::Decimal;

    use crate::{Error, product::Price};

    #[test]
    fn accepts_two_decimal_places() {
        let price = Price::new(Decimal::new(999, 2)).unwrap();

        assert_eq!(price.cents(), 999);
        assert_eq!(price.amount(), Decimal::new(999, 2));
    }

    #[test]
    fn accepts_whole_numbers_and_trailing_zeros() {
        assert_eq!(Price::new(Decimal::from(20)).unwrap().cents(), 2000);
        assert_eq!(Price::new(Decimal::new(15000, 3)).unwrap().cents(), 1500);
        assert_eq!(Price::new(Decimal::ZERO).unwrap().cents(), 0);
    }

    #[test]
    fn rejects_negative_prices() {
        let amount = Decimal::new(-1, 2);

        assert_eq!(Price::new(amount), Err(Error::InvalidPrice(amount)));
    }

    #[test]
    fn rejects_more_than_two_decimal_places() {
        let amount = Decimal::new(9995, 3);

        assert_eq!(Price::new(amount), Err(Error::InvalidPrice(amount)));
    }

    #[test]
    fn rejects_prices_at_the_upper_limit() {
        let amount = Decimal::from(Price::UPPER_LIMIT);

        assert_eq!(Price::new(amount), Err(Error::InvalidPrice(amount)));
        assert!(Price::new(Decimal::new(9_999_999_999, 2)).is_ok());
    }

    #[test]
    fn displays_with_two_decimal_places() {
        assert_eq!(Price::from_cents(990).to_string(), "9.90");
    }
}


#[cfg(test)]
mod stock_quantity_tests {
    use crate::{Error, product::StockQuantity};

    #[test]
    fn rejects_negative_quantities() {
        assert_eq!(StockQuantity::new(-1), Err(Error::InvalidStockQuantity(-1)));
    }

    #[test]
    fn accepts_zero_and_positive_quantities() {
        assert_eq!(StockQuantity::new(0).unwrap().get(), 0);
        assert_eq!(StockQuantity::new(1000).unwrap().get(), 1000);
    }
}
