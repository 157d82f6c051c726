//! Guessing spaces and functional areas from free text.
//!
//! Matching is case-insensitive substring containment of a candidate's name
//! in the text. Names are compared as stored, untrimmed. Candidates with an
//! empty name never match.
use crate::model::{FunctionalArea, Named, Space};

fn contains_name<T: Named>(haystack_lower: &str, candidate: &T) -> bool {
    let name = candidate.name();
    !name.is_empty() && haystack_lower.contains(&name.to_lowercase())
}

/// First space, in candidate order, whose name occurs in `location`.
pub fn guess_space<'a>(location: &str, spaces: &'a [Space]) -> Option<&'a Space> {
    let location = location.to_lowercase();
    spaces.iter().find(|s| contains_name(&location, *s))
}

/// Every functional area whose name occurs in `description`.
pub fn guess_functional_areas<'a>(
    description: &str,
    areas: &'a [FunctionalArea],
) -> Vec<&'a FunctionalArea> {
    let description = description.to_lowercase();
    areas
        .iter()
        .filter(|a| contains_name(&description, *a))
        .collect()
}
