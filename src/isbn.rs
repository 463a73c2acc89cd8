//! ISBN normalization and checksum validation.
//!
//! Pure functions; the catalog uses them before persisting a book.

/// Why a string is not a valid ISBN.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IsbnError {
    #[error("ISBN must have 10 or 13 characters, got {0}")]
    InvalidLength(usize),

    #[error("ISBN contains an invalid character: {0:?}")]
    InvalidCharacter(char),

    #[error("ISBN checksum mismatch: {0}")]
    InvalidChecksum(String),
}

/// Strip hyphens and spaces, upper-case a trailing `x`.
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Validate an ISBN-10 (hyphens and spaces allowed).
pub fn is_valid_isbn10(raw: &str) -> bool {
    check_isbn10(&normalize(raw)).is_ok()
}

/// Validate an ISBN-13 (hyphens and spaces allowed).
pub fn is_valid_isbn13(raw: &str) -> bool {
    check_isbn13(&normalize(raw)).is_ok()
}

/// Validate an ISBN of either length, returning its normalized form.
pub fn validate(raw: &str) -> Result<String, IsbnError> {
    let isbn = normalize(raw);
    match isbn.len() {
        10 => check_isbn10(&isbn)?,
        13 => check_isbn13(&isbn)?,
        len => return Err(IsbnError::InvalidLength(len)),
    }
    Ok(isbn)
}

/// Convert a valid ISBN-10 or ISBN-13 into ISBN-13 form.
pub fn to_isbn13(raw: &str) -> Option<String> {
    let isbn = validate(raw).ok()?;
    if isbn.len() == 13 {
        return Some(isbn);
    }

    let body = format!("978{}", &isbn[..9]);
    let check = isbn13_check_digit(&body)?;
    Some(format!("{body}{check}"))
}

/// Convert a valid `978`-prefixed ISBN-13 (or an ISBN-10) into ISBN-10 form.
pub fn to_isbn10(raw: &str) -> Option<String> {
    let isbn = validate(raw).ok()?;
    if isbn.len() == 10 {
        return Some(isbn);
    }
    let body = isbn.strip_prefix("978")?.get(..9)?;

    let sum: u32 = digits(body)?
        .iter()
        .enumerate()
        .map(|(i, d)| (10 - i as u32) * d)
        .sum();
    let check = match (11 - sum % 11) % 11 {
        10 => 'X',
        n => char::from_digit(n, 10)?,
    };
    Some(format!("{body}{check}"))
}

fn check_isbn10(isbn: &str) -> Result<(), IsbnError> {
    if isbn.len() != 10 {
        return Err(IsbnError::InvalidLength(isbn.chars().count()));
    }

    let mut sum = 0;
    for (i, c) in isbn.chars().enumerate() {
        let value = match c {
            'X' if i == 9 => 10,
            c => c.to_digit(10).ok_or(IsbnError::InvalidCharacter(c))?,
        };
        sum += (10 - i as u32) * value;
    }

    if sum % 11 == 0 {
        Ok(())
    } else {
        Err(IsbnError::InvalidChecksum(isbn.to_string()))
    }
}

fn check_isbn13(isbn: &str) -> Result<(), IsbnError> {
    if isbn.len() != 13 {
        return Err(IsbnError::InvalidLength(isbn.chars().count()));
    }
    if let Some(c) = isbn.chars().find(|c| !c.is_ascii_digit()) {
        return Err(IsbnError::InvalidCharacter(c));
    }

    let expected = isbn13_check_digit(&isbn[..12]);
    if expected == isbn.chars().last() {
        Ok(())
    } else {
        Err(IsbnError::InvalidChecksum(isbn.to_string()))
    }
}

/// Check digit for the first 12 digits of an ISBN-13.
fn isbn13_check_digit(body: &str) -> Option<char> {
    let sum: u32 = digits(body)?
        .iter()
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { *d } else { d * 3 })
        .sum();
    char::from_digit((10 - sum % 10) % 10, 10)
}

fn digits(s: &str) -> Option<Vec<u32>> {
    s.chars().map(|c| c.to_digit(10)).collect()
}
