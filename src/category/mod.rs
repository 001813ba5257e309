//! Categories group products in the catalog.

mod db;
mod domain;

pub use db::{
    count_categories, create_category, create_category_table, delete_category, find_category,
    get_all_categories, get_category, update_category,
};
pub(crate) use db::map_row as map_category_row;
pub use domain::{Category, CategoryId, CategoryName, CategoryPatch, NewCategory};
