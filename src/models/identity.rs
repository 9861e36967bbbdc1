//! Identity shared by every entity kind, and the id-or-name lookup key.

use std::fmt;

/// An entity identified by an integer id unique within its kind.
///
/// Equality, hashing and ordering of every entity are defined over the id
/// alone, so two instances with the same id are interchangeable even when
/// one of them is partial or holds an older snapshot.
pub trait Identified {
    /// The entity id.
    fn id(&self) -> i64;

    /// The display name carried by every payload, partial or full.
    fn name(&self) -> &str;
}

/// Implements [`Identified`] plus id-only `Eq`/`Hash`/`Ord` for types with
/// `id: i64` and `name: String` fields.
macro_rules! identified_by_id {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::models::Identified for $ty {
                fn id(&self) -> i64 {
                    self.id
                }

                fn name(&self) -> &str {
                    &self.name
                }
            }

            impl PartialEq for $ty {
                fn eq(&self, other: &Self) -> bool {
                    self.id == other.id
                }
            }

            impl Eq for $ty {}

            impl std::hash::Hash for $ty {
                fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                    self.id.hash(state);
                }
            }

            impl PartialOrd for $ty {
                fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
                    Some(self.cmp(other))
                }
            }

            impl Ord for $ty {
                fn cmp(&self, other: &Self) -> std::cmp::Ordering {
                    self.id.cmp(&other.id)
                }
            }
        )+
    };
}

pub(crate) use identified_by_id;

/// How a caller names an entity: by id or by exact name.
///
/// ```
/// use cbapi::Lookup;
///
/// assert_eq!(Lookup::from(42_i64), Lookup::Id(42));
/// assert_eq!(Lookup::from("Bugs"), Lookup::Name("Bugs".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Lookup {
    Id(i64),
    Name(String),
}

impl Lookup {
    /// Whether an entity with this id and name is the one being looked up.
    pub fn matches(&self, id: i64, name: &str) -> bool {
        match self {
            Lookup::Id(wanted) => *wanted == id,
            Lookup::Name(wanted) => wanted == name,
        }
    }

    /// Find the first entity in `items` this lookup names.
    pub fn find<'a, T, I>(&self, items: I) -> Option<&'a T>
    where
        T: Identified + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        items
            .into_iter()
            .find(|item| self.matches(item.id(), item.name()))
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookup::Id(id) => write!(f, "{id}"),
            Lookup::Name(name) => f.write_str(name),
        }
    }
}

impl From<i64> for Lookup {
    fn from(id: i64) -> Self {
        Lookup::Id(id)
    }
}

impl From<&str> for Lookup {
    fn from(name: &str) -> Self {
        Lookup::Name(name.to_string())
    }
}

impl From<String> for Lookup {
    fn from(name: String) -> Self {
        Lookup::Name(name)
    }
}

impl From<&String> for Lookup {
    fn from(name: &String) -> Self {
        Lookup::Name(name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChoiceValue;

    #[test]
    fn test_lookup_matches() {
        assert!(Lookup::Id(3).matches(3, "anything"));
        assert!(!Lookup::Id(3).matches(4, "anything"));
        assert!(Lookup::from("Status").matches(9, "Status"));
        assert!(!Lookup::from("status").matches(9, "Status"));
    }

    #[test]
    fn test_lookup_find() {
        let choices = vec![
            ChoiceValue::new(1, "Open"),
            ChoiceValue::new(2, "Closed"),
        ];
        assert_eq!(Lookup::from("Closed").find(&choices).map(|c| c.id), Some(2));
        assert_eq!(Lookup::Id(1).find(&choices).map(|c| c.name.as_str()), Some("Open"));
        assert!(Lookup::Id(5).find(&choices).is_none());
    }

    #[test]
    fn test_lookup_display() {
        assert_eq!(Lookup::Id(12).to_string(), "12");
        assert_eq!(Lookup::from("Bugs").to_string(), "Bugs");
    }
}
