//! The fixed set of permitted category labels.
//!
//! Categories are an externally defined list: it validates the category
//! picked at the form boundary and populates filter choices. Order is
//! meaningful for display.

pub const PERMITTED_CATEGORIES: [&str; 5] = ["Work", "Personal", "Shopping", "Health", "Other"];

pub fn is_permitted(label: &str) -> bool {
    PERMITTED_CATEGORIES.iter().any(|cat| *cat == label)
}
