//! URL template substitution.

use std::collections::HashMap;

use strfmt::strfmt;

use crate::error::TileError;
use crate::tile::TileIndex;

use super::Provider;

/// Placeholders every template must contain.
const REQUIRED_PLACEHOLDERS: [&str; 3] = ["{x}", "{y}", "{z}"];

/// Render the request URL for `tile`.
///
/// `{s}` is replaced by `subdomain` (empty when the provider has none) and
/// `{r}` by an empty string unless the provider sets an `r` parameter.
/// Provider parameters fill any other placeholder; `x`, `y`, `z` and `s`
/// always come from the request.
///
/// # Errors
///
/// Returns `InvalidUrlTemplate` if the template lacks `{x}`, `{y}` or `{z}`,
/// references an unknown placeholder, or fails to parse.
pub fn render_url(
    provider: &Provider,
    tile: TileIndex,
    subdomain: Option<char>,
) -> Result<String, TileError> {
    let invalid = |message: String| TileError::InvalidUrlTemplate {
        provider: provider.name().to_string(),
        message,
    };

    let template = provider.url();
    if let Some(missing) = REQUIRED_PLACEHOLDERS
        .iter()
        .find(|placeholder| !template.contains(*placeholder))
    {
        return Err(invalid(format!("template {template:?} lacks {missing}")));
    }

    let mut vars: HashMap<String, String> = HashMap::with_capacity(provider.params().len() + 5);
    vars.insert("r".to_string(), String::new());
    for (key, value) in provider.params() {
        vars.insert(key.clone(), value.clone());
    }
    vars.insert("x".to_string(), tile.x.to_string());
    vars.insert("y".to_string(), tile.y.to_string());
    vars.insert("z".to_string(), tile.zoom.to_string());
    vars.insert(
        "s".to_string(),
        subdomain.map(String::from).unwrap_or_default(),
    );

    strfmt(template, &vars).map_err(|e| invalid(e.to_string()))
}
