use std::num::ParseIntError;

use crate::models::Person;

/// Case-insensitive match on last name, first name or id, optionally
/// restricted to one level. An empty query matches everyone.
pub fn filter_people<'a>(people: &'a [Person], query: &str, level: Option<i64>) -> Vec<&'a Person> {
    let needle = query.trim().to_lowercase();
    people
        .iter()
        .filter(|p| matches_query(p, &needle))
        .filter(|p| level.is_none() || p.level.id() == level)
        .collect()
}

fn matches_query(person: &Person, needle: &str) -> bool {
    needle.is_empty()
        || person.last_name.to_lowercase().contains(needle)
        || person.first_name.to_lowercase().contains(needle)
        || person.id.to_string().contains(needle)
}

/// `"All"` and blanks mean no level filter; anything else must be an id.
pub fn parse_level_filter(raw: Option<&str>) -> Result<Option<i64>, ParseIntError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) if s.eq_ignore_ascii_case("all") => Ok(None),
        Some(s) => s.parse().map(Some),
    }
}
