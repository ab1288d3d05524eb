/// Separator substituted for `", "` in search slugs
///
/// Distinct from the single hyphen used for plain spaces so that
/// "Myrtle Beach, South Carolina" keeps its comma boundaries.
pub const LIST_SEPARATOR: &str = "--";

/// Turns a search keyword into the path segment used by the search page
///
/// # Examples
///
/// ```
/// use listing_harvester::url::slugify_keyword;
///
/// assert_eq!(
///     slugify_keyword("Myrtle Beach, South Carolina, United States"),
///     "Myrtle-Beach--South-Carolina--United-States"
/// );
/// ```
pub fn slugify_keyword(keyword: &str) -> String {
    keyword
        .trim()
        .replace(", ", LIST_SEPARATOR)
        .replace(' ', "-")
}

/// Turns a search keyword into a file stem for its output file
///
/// Unlike [`slugify_keyword`], commas collapse into a single hyphen.
pub fn file_slug(keyword: &str) -> String {
    keyword.trim().replace(", ", "-").replace(' ', "-")
}
