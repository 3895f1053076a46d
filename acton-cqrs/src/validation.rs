//! Declarative validation rules
//!
//! A [`RuleSet`] is a list of `(field, predicate, message)` rules for one
//! command or query type. [`RuleSet::validate`] runs every rule and either
//! returns the value untouched or a [`ValidationFailure`] listing every
//! violated field. An empty rule set accepts everything.
//!
//! # Example
//!
//! ```rust
//! use acton_cqrs::validation::RuleSet;
//!
//! #[derive(Debug)]
//! struct CreateProduct {
//!     name: String,
//!     price: u32,
//! }
//!
//! let rules = RuleSet::new()
//!     .not_empty("name", |c: &CreateProduct| &c.name)
//!     .range("price", |c: &CreateProduct| c.price, 1, 10_000);
//!
//! let failure = rules
//!     .validate(CreateProduct { name: String::new(), price: 0 })
//!     .unwrap_err();
//! assert_eq!(failure.errors().len(), 2);
//! ```

use std::fmt;

use crate::failure::ValidationFailure;

type Predicate<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

struct Rule<T> {
    field: String,
    predicate: Predicate<T>,
    message: String,
}

/// Values that have a meaningful "empty" state
pub trait Emptiness {
    /// True when the value counts as empty
    fn is_empty_value(&self) -> bool;
}

impl Emptiness for str {
    fn is_empty_value(&self) -> bool {
        self.trim().is_empty()
    }
}

impl Emptiness for String {
    fn is_empty_value(&self) -> bool {
        self.as_str().is_empty_value()
    }
}

impl<T> Emptiness for Vec<T> {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<T: Emptiness> Emptiness for Option<T> {
    fn is_empty_value(&self) -> bool {
        self.as_ref().is_none_or(Emptiness::is_empty_value)
    }
}

impl Emptiness for uuid::Uuid {
    fn is_empty_value(&self) -> bool {
        self.is_nil()
    }
}

/// Rules declared for one command or query type
pub struct RuleSet<T> {
    rules: Vec<Rule<T>>,
}

impl<T> Default for RuleSet<T> {
    fn default() -> Self {
        Self { rules: Vec::new() }
    }
}

impl<T> fmt::Debug for RuleSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.rules.iter().map(|r| r.field.as_str()).collect();
        f.debug_struct("RuleSet").field("rules", &fields).finish()
    }
}

impl<T> RuleSet<T> {
    /// Create an empty rule set, which accepts every value
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule: `predicate` must hold, otherwise `message` is recorded
    /// against `field`
    #[must_use]
    pub fn rule<P>(mut self, field: impl Into<String>, predicate: P, message: impl Into<String>) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.rules.push(Rule {
            field: field.into(),
            predicate: Box::new(predicate),
            message: message.into(),
        });
        self
    }

    /// The accessed value must not be empty (blank string, empty collection,
    /// `None`, nil UUID)
    #[must_use]
    pub fn not_empty<A, V>(self, field: &str, accessor: A) -> Self
    where
        A: Fn(&T) -> &V + Send + Sync + 'static,
        V: Emptiness + ?Sized,
    {
        let message = format!("'{field}' must not be empty.");
        self.rule(field, move |value| !accessor(value).is_empty_value(), message)
    }

    /// The accessed UUID must not be the nil UUID
    #[must_use]
    pub fn not_nil<A>(self, field: &str, accessor: A) -> Self
    where
        A: Fn(&T) -> uuid::Uuid + Send + Sync + 'static,
    {
        let message = format!("'{field}' must not be nil.");
        self.rule(field, move |value| !accessor(value).is_nil(), message)
    }

    /// The accessed string must be at most `max` characters long
    #[must_use]
    pub fn max_length<A>(self, field: &str, accessor: A, max: usize) -> Self
    where
        A: Fn(&T) -> &str + Send + Sync + 'static,
    {
        let message = format!("'{field}' must be at most {max} characters.");
        self.rule(
            field,
            move |value| accessor(value).chars().count() <= max,
            message,
        )
    }

    /// The accessed value must lie within `min..=max`
    #[must_use]
    pub fn range<A, V>(self, field: &str, accessor: A, min: V, max: V) -> Self
    where
        A: Fn(&T) -> V + Send + Sync + 'static,
        V: PartialOrd + fmt::Display + Send + Sync + 'static,
    {
        let message = format!("'{field}' must be between {min} and {max}.");
        self.rule(
            field,
            move |value| {
                let v = accessor(value);
                v >= min && v <= max
            },
            message,
        )
    }

    /// Number of declared rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True when no rule is declared
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run every rule against `value` without consuming it
    pub fn check(&self, value: &T) -> Result<(), ValidationFailure> {
        let mut failure = ValidationFailure::new();
        for rule in &self.rules {
            if !(rule.predicate)(value) {
                failure.add(rule.field.clone(), rule.message.clone());
            }
        }

        if failure.is_empty() {
            Ok(())
        } else {
            Err(failure)
        }
    }

    /// Run every rule, handing the value back when all of them hold
    pub fn validate(&self, value: T) -> Result<T, ValidationFailure> {
        self.check(&value).map(|()| value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[derive(Debug, Clone, PartialEq)]
    struct CreateProduct {
        id: Uuid,
        name: String,
        description: Option<String>,
        price: f64,
        tags: Vec<String>,
    }

    fn valid() -> CreateProduct {
        CreateProduct {
            id: Uuid::new_v4(),
            name: "Keyboard".to_string(),
            description: Some("Mechanical".to_string()),
            price: 49.5,
            tags: vec!["peripherals".to_string()],
        }
    }

    fn rules() -> RuleSet<CreateProduct> {
        RuleSet::new()
            .not_empty("id", |c: &CreateProduct| &c.id)
            .not_empty("name", |c: &CreateProduct| &c.name)
            .max_length("name", |c: &CreateProduct| c.name.as_str(), 10)
            .range("price", |c: &CreateProduct| c.price, 0.0, 1000.0)
    }

    #[test]
    fn test_empty_rule_set_is_identity() {
        let rules = RuleSet::<CreateProduct>::new();
        assert!(rules.is_empty());
        let product = valid();
        assert_eq!(rules.validate(product.clone()).unwrap(), product);
    }

    #[test]
    fn test_valid_value_passes_through() {
        let product = valid();
        assert_eq!(rules().validate(product.clone()).unwrap(), product);
    }

    #[test]
    fn test_collects_every_violated_field() {
        let product = CreateProduct {
            id: Uuid::nil(),
            price: -1.0,
            ..valid()
        };
        let failure = rules().validate(product).unwrap_err();

        let fields: Vec<&str> = failure.errors().keys().map(String::as_str).collect();
        assert_eq!(fields, vec!["id", "price"]);
        assert_eq!(failure.errors()["price"], vec!["'price' must be between 0 and 1000."]);
    }

    #[test]
    fn test_multiple_rules_on_one_field() {
        let product = CreateProduct {
            name: "   ".repeat(5),
            ..valid()
        };
        let failure = rules().validate(product).unwrap_err();
        assert_eq!(failure.errors()["name"].len(), 2);
        assert_eq!(failure.error_count(), 2);
    }

    #[test]
    fn test_emptiness_of_optionals_and_collections() {
        let rules = RuleSet::new()
            .not_empty("description", |c: &CreateProduct| &c.description)
            .not_empty("tags", |c: &CreateProduct| &c.tags);

        let product = CreateProduct {
            description: None,
            tags: Vec::new(),
            ..valid()
        };
        let failure = rules.check(&product).unwrap_err();
        assert_eq!(failure.errors().len(), 2);
    }

    #[test]
    fn test_not_nil_uuid() {
        let rules = RuleSet::new().not_nil("id", |c: &CreateProduct| c.id);
        assert!(rules.check(&valid()).is_ok());

        let product = CreateProduct {
            id: Uuid::nil(),
            ..valid()
        };
        assert_eq!(
            rules.check(&product).unwrap_err().errors()["id"],
            vec!["'id' must not be nil."]
        );
    }

    #[test]
    fn test_custom_rule() {
        let rules = RuleSet::new().rule(
            "tags",
            |c: &CreateProduct| c.tags.len() <= 1,
            "at most one tag",
        );
        let product = CreateProduct {
            tags: vec!["a".into(), "b".into()],
            ..valid()
        };
        assert_eq!(
            rules.check(&product).unwrap_err().errors()["tags"],
            vec!["at most one tag"]
        );
    }
}
