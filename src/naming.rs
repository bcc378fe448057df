//! Identifier case conversion between record fields and SQL columns.

/// Converts `UpperCamel` / `lowerCamel` identifiers to `lower_snake`.
///
/// An underscore is inserted between any character and a following uppercase
/// letter; pairs do not overlap, so acronyms collapse (`userID` → `user_id`).
/// Identifiers that are already snake case come back unchanged.
pub fn to_snake_case(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 4);
    let mut i = 0;
    while i < chars.len() {
        let current = chars[i];
        match chars.get(i + 1) {
            Some(next) if next.is_uppercase() => {
                out.push(current);
                if current != '_' {
                    out.push('_');
                }
                out.push(*next);
                i += 2;
            }
            _ => {
                out.push(current);
                i += 1;
            }
        }
    }
    out.to_lowercase()
}

/// Converts `lower_snake` identifiers to `lowerCamel`.
pub fn to_camel_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        match chars.peek() {
            Some(next) if c == '_' && next.is_ascii_lowercase() => {
                out.push(next.to_ascii_uppercase());
                chars.next();
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case_from_camel() {
        assert_eq!(to_snake_case("UserAccount"), "user_account");
        assert_eq!(to_snake_case("firstName"), "first_name");
        assert_eq!(to_snake_case("userID"), "user_id");
        assert_eq!(to_snake_case("hire_date"), "hire_date");
        assert_eq!(to_snake_case("id"), "id");
    }

    #[test]
    fn camel_case_from_snake() {
        assert_eq!(to_camel_case("first_name"), "firstName");
        assert_eq!(to_camel_case("id"), "id");
        assert_eq!(to_camel_case("a_b_c"), "aBC");
    }
}
