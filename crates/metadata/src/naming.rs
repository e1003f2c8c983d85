//! Naming helpers used by conventions and the relationship resolver

use heck::{ToSnakeCase, ToUpperCamelCase};

/// Type name recorded on implicit join entity types
pub const PROPERTY_BAG_TYPE: &str = "#PropertyBag";

/// Name of the shadow key created for principals without a primary key
pub const TEMPORARY_KEY_NAME: &str = "TempId";

/// Lowercase form with separators removed, used for name matching
///
/// `customer_id`, `CustomerId` and `customerId` all normalize to
/// `customerid`.
pub fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Whether two member names match after normalization
pub fn names_match(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

/// Name of a dependent property combining a prefix and a principal key property
///
/// Follows the casing of the key property: `Customer` + `Id` gives
/// `CustomerId`, `customer` + `id` gives `customer_id`. A key property that
/// already starts with the prefix is used as is.
///
/// # Examples
///
/// - ("Customer", "Id") -> "CustomerId"
/// - ("Customer", "CustomerId") -> "CustomerId"
/// - ("author", "id") -> "author_id"
pub fn foreign_key_property_name(prefix: &str, key_property: &str) -> String {
    if normalize(key_property).starts_with(&normalize(prefix)) {
        return key_property.to_string();
    }
    let snake = key_property
        .chars()
        .next()
        .is_some_and(|c| c.is_lowercase());
    if snake {
        format!("{}_{}", prefix.to_snake_case(), key_property.to_snake_case())
    } else {
        format!(
            "{}{}",
            prefix.to_upper_camel_case(),
            key_property.to_upper_camel_case()
        )
    }
}

/// First of `base`, `base1`, `base2`, ... not taken
pub fn uniquify(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{}{}", base, n))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Name of an owned entity type, scoped to the navigation that owns it
pub fn owned_entity_name(owner: &str, navigation: &str, type_name: &str) -> String {
    format!("{}.{}#{}", owner, navigation, type_name)
}

/// Name of the implicit join entity type of a many-to-many relationship
pub fn join_entity_name(left: &str, right: &str) -> String {
    format!("{}{}", left.to_upper_camel_case(), right.to_upper_camel_case())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("Customer_Id"), "customerid");
        assert!(names_match("customer_id", "CustomerId"));
        assert!(!names_match("CustomerId", "Customer"));
    }

    #[test]
    fn test_foreign_key_property_name() {
        assert_eq!(foreign_key_property_name("Customer", "Id"), "CustomerId");
        assert_eq!(foreign_key_property_name("Customer", "CustomerId"), "CustomerId");
        assert_eq!(foreign_key_property_name("author", "id"), "author_id");
        assert_eq!(foreign_key_property_name("BlogPost", "id"), "blog_post_id");
    }

    #[test]
    fn test_uniquify() {
        let taken = ["CustomerId", "CustomerId1"];
        assert_eq!(uniquify("CustomerId", |n| taken.contains(&n)), "CustomerId2");
        assert_eq!(uniquify("OrderId", |n| taken.contains(&n)), "OrderId");
    }

    #[test]
    fn test_scoped_names() {
        assert_eq!(
            owned_entity_name("Customer", "ShippingAddress", "Address"),
            "Customer.ShippingAddress#Address"
        );
        assert_eq!(join_entity_name("Post", "Tag"), "PostTag");
    }
}
