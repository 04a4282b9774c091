//! Conjunctive keyword queries: every query term must be present.

use std::collections::BTreeSet;

use crate::persistence::IndexMetadata;
use crate::tokenizer::Tokenizer;

/// Distinct normalized terms of a query string
pub fn parse_query(tokenizer: &Tokenizer, query: &str) -> BTreeSet<String> {
    tokenizer.unique_terms(query)
}

/// Offsets of documents containing every term, in ascending order.
///
/// No terms, or any term without postings, yields an empty result.
pub fn matching_offsets<'a, I>(metadata: &IndexMetadata, terms: I) -> Vec<u64>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut sets = Vec::new();
    for term in terms {
        match metadata.postings(term) {
            Some(offsets) if !offsets.is_empty() => sets.push(offsets),
            _ => return Vec::new(),
        }
    }

    // Walk the rarest term and probe the others
    sets.sort_by_key(|offsets| offsets.len());
    let Some((smallest, rest)) = sets.split_first() else {
        return Vec::new();
    };

    smallest
        .iter()
        .copied()
        .filter(|offset| rest.iter().all(|offsets| offsets.contains(offset)))
        .collect()
}
