//! The query mini-language.
//!
//! ```text
//! all
//! type=<int>[,<int>...]
//! species=<int>[,<int>...]
//! type=<int>,...::species=<int>,...        (either order)
//! distance=<float> FROM x=<float>,y=<float>::height=<float>
//! ```
//!
//! Whitespace around tokens is ignored. Type codes are the numeric
//! [`TreeType`] codes.

use thicket_core::{QueryError, SpeciesId, SpeciesList, TreeType, TypeMask};
use thicket_index::{QuerySpec, SpeciesSet};

fn parse_error(token: &str, reason: impl Into<String>) -> QueryError {
    QueryError::Parse {
        token: token.to_string(),
        reason: reason.into(),
    }
}

/// Split `key=value`, trimming both sides.
fn key_value(token: &str) -> Result<(&str, &str), QueryError> {
    let (key, value) = token
        .split_once('=')
        .ok_or_else(|| parse_error(token, "expected key=value"))?;
    Ok((key.trim(), value.trim()))
}

fn number<T: std::str::FromStr>(token: &str, value: &str) -> Result<T, QueryError> {
    value
        .parse()
        .map_err(|_| parse_error(token, format!("'{value}' is not a valid number")))
}

/// Parse a query string into a spec.
///
/// Criteria are checked against `species_count`; geometric validation
/// happens when the cursor is opened.
pub fn parse(query: &str, species_count: u16) -> Result<QuerySpec, QueryError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(parse_error(query, "empty query"));
    }
    if query == "all" {
        return Ok(QuerySpec::All);
    }
    let head = query.split("::").next().unwrap_or(query).trim();
    if head.starts_with("distance") {
        return parse_distance(query);
    }

    let mut types: Option<TypeMask> = None;
    let mut species: Option<SpeciesList> = None;
    for part in query.split("::") {
        let token = part.trim();
        let (key, list) = key_value(token)?;
        match key {
            "type" => {
                if types.is_some() {
                    return Err(parse_error(token, "type given twice"));
                }
                let mut mask = TypeMask::EMPTY;
                for item in list.split(',') {
                    let code: u8 = number(token, item.trim())?;
                    let ty = TreeType::from_code(code)
                        .ok_or_else(|| parse_error(token, format!("unknown type code {code}")))?;
                    if !ty.is_indexed() {
                        return Err(parse_error(token, format!("{ty} trees are not indexed")));
                    }
                    mask.insert(ty);
                }
                types = Some(mask);
            }
            "species" => {
                if species.is_some() {
                    return Err(parse_error(token, "species given twice"));
                }
                let mut ids = SpeciesList::new();
                for item in list.split(',') {
                    let code: u16 = number(token, item.trim())?;
                    if code >= species_count {
                        return Err(parse_error(token, format!("unknown species code {code}")));
                    }
                    ids.push(SpeciesId(code));
                }
                species = Some(ids);
            }
            _ => return Err(parse_error(token, "unrecognized criterion")),
        }
    }

    match (types, species) {
        (Some(mask), None) => Ok(QuerySpec::Type(mask)),
        (types, Some(ids)) => Ok(QuerySpec::TypeSpecies {
            types: types.unwrap_or(TypeMask::INDEXED),
            species: SpeciesSet::from_ids(ids, species_count as usize)?,
        }),
        (None, None) => Err(parse_error(query, "no criteria")),
    }
}

/// `distance=<r> FROM x=<x>,y=<y>::height=<h>`
fn parse_distance(query: &str) -> Result<QuerySpec, QueryError> {
    let mut parts = query.split("::");
    let main = parts.next().unwrap_or_default().trim();
    let height_token = parts
        .next()
        .map(str::trim)
        .ok_or_else(|| parse_error(query, "missing ::height=<float>"))?;
    if let Some(extra) = parts.next() {
        return Err(parse_error(extra.trim(), "unexpected criterion after height"));
    }

    let (radius_token, anchor) = main
        .split_once("FROM")
        .ok_or_else(|| parse_error(main, "expected 'FROM x=<float>,y=<float>'"))?;
    let radius_token = radius_token.trim();
    let (key, value) = key_value(radius_token)?;
    if key != "distance" {
        return Err(parse_error(radius_token, "expected distance=<float>"));
    }
    let radius: f32 = number(radius_token, value)?;

    let mut x = None;
    let mut y = None;
    for coord in anchor.split(',') {
        let token = coord.trim();
        let (key, value) = key_value(token)?;
        let slot = match key {
            "x" => &mut x,
            "y" => &mut y,
            _ => return Err(parse_error(token, "expected x=<float> or y=<float>")),
        };
        if slot.is_some() {
            return Err(parse_error(token, "coordinate given twice"));
        }
        *slot = Some(number::<f32>(token, value)?);
    }
    let anchor = anchor.trim();
    let x = x.ok_or_else(|| parse_error(anchor, "missing x"))?;
    let y = y.ok_or_else(|| parse_error(anchor, "missing y"))?;

    let (key, value) = key_value(height_token)?;
    if key != "height" {
        return Err(parse_error(height_token, "expected height=<float>"));
    }
    let min_height: f32 = number(height_token, value)?;

    Ok(QuerySpec::distance(x, y, radius, min_height))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_of(err: QueryError) -> String {
        match err {
            QueryError::Parse { token, .. } => token,
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[test]
    fn parses_all() {
        assert_eq!(parse("  all ", 1), Ok(QuerySpec::All));
    }

    #[test]
    fn parses_type_list() {
        let spec = parse("type=2,3", 1).unwrap();
        assert_eq!(spec, QuerySpec::types([TreeType::Sapling, TreeType::Adult]));
    }

    #[test]
    fn parses_species_alone_as_all_indexed_types() {
        match parse("species = 1", 2).unwrap() {
            QuerySpec::TypeSpecies { types, species } => {
                assert_eq!(types, TypeMask::INDEXED);
                assert!(species.contains(SpeciesId(1)));
                assert!(!species.contains(SpeciesId(0)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn combined_criteria_in_either_order() {
        let a = parse("type=3::species=0,2", 3).unwrap();
        let b = parse("species=0,2 :: type=3", 3).unwrap();
        assert_eq!(a, b);
        match a {
            QuerySpec::TypeSpecies { types, species } => {
                assert_eq!(types, TypeMask::only(TreeType::Adult));
                assert_eq!(species.iter().collect::<Vec<_>>(), vec![SpeciesId(0), SpeciesId(2)]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_distance() {
        let spec = parse("distance=3 FROM x=9.5,y=0.5::height=1.5", 1).unwrap();
        assert_eq!(spec, QuerySpec::distance(9.5, 0.5, 3.0, 1.5));
        let spaced = parse(" distance = 3  FROM  x = 9.5 , y = 0.5 :: height = 1.5 ", 1).unwrap();
        assert_eq!(spaced, spec);
    }

    #[test]
    fn errors_name_the_offending_token() {
        assert_eq!(token_of(parse("typ=2", 1).unwrap_err()), "typ=2");
        assert_eq!(token_of(parse("type=2,x", 1).unwrap_err()), "type=2,x");
        assert_eq!(token_of(parse("type=9", 1).unwrap_err()), "type=9");
        assert_eq!(token_of(parse("type=3,4", 1).unwrap_err()), "type=3,4");
        assert_eq!(
            token_of(parse("species=0 :: type=4", 1).unwrap_err()),
            "type=4"
        );
        assert_eq!(token_of(parse("species=4", 2).unwrap_err()), "species=4");
        assert_eq!(
            token_of(parse("distance=abc FROM x=1,y=1::height=0", 1).unwrap_err()),
            "distance=abc"
        );
        assert_eq!(
            token_of(parse("distance=2 FROM x=1,y=1::height=tall", 1).unwrap_err()),
            "height=tall"
        );
        assert_eq!(
            token_of(parse("distance=2 FROM x=1,z=1::height=0", 1).unwrap_err()),
            "z=1"
        );
    }

    #[test]
    fn distance_requires_height_and_anchor() {
        assert!(parse("distance=2 FROM x=1,y=1", 1).is_err());
        assert!(parse("distance=2 FROM x=1::height=0", 1).is_err());
        assert!(parse("distance=2 x=1,y=1::height=0", 1).is_err());
    }

    #[test]
    fn repeated_criteria_are_rejected() {
        assert!(parse("type=1::type=2", 1).is_err());
        assert!(parse("species=0::species=0", 1).is_err());
    }
}
