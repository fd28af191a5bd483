//! List-filter translation for the `filter` query parameter.
//!
//! Provisioning clients use a narrow slice of the SCIM filter grammar for
//! lookup-by-attribute, so the translator recognizes exactly the equality
//! filters they send and evaluates them in memory over the tenant's
//! collection. Unrecognized expressions degrade to a pass-through filter
//! rather than failing the list, matching how permissive directories behave.

use crate::error::{ScimError, ScimResult};
use serde_json::{Map, Value};

/// An evaluatable filter over resources of one type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceFilter {
    /// `userName eq "v"`, compared case-insensitively.
    UserNameEq(String),
    /// `displayName eq "v"`, compared case-normalized.
    DisplayNameEq(String),
    /// `id eq "v"`, exact match.
    IdEq(String),
    /// `externalId eq "v"`, exact match.
    ExternalIdEq(String),
    /// Anything unrecognized: matches every resource.
    All,
}

impl ResourceFilter {
    /// Whether a resource's attribute map satisfies the filter.
    pub fn matches(&self, data: &Map<String, Value>) -> bool {
        let get = |key: &str| data.get(key).and_then(Value::as_str);
        match self {
            Self::UserNameEq(expected) => get("userName")
                .map(|v| v.to_lowercase() == expected.to_lowercase())
                .unwrap_or(false),
            Self::DisplayNameEq(expected) => get("displayName")
                .map(|v| v.to_lowercase() == expected.to_lowercase())
                .unwrap_or(false),
            Self::IdEq(expected) => get("id").map(|v| v == expected).unwrap_or(false),
            Self::ExternalIdEq(expected) => {
                get("externalId").map(|v| v == expected).unwrap_or(false)
            }
            Self::All => true,
        }
    }
}

/// Translate a raw filter expression for a resource type.
///
/// Recognized: `userName eq "v"`, `displayName eq "v"`, `id eq "v"`,
/// `externalId eq "v"` (attribute names in any case). A member selection
/// expression using the `type` sub-attribute is rejected; everything else
/// unrecognized passes through.
pub fn translate(resource_type: &str, expression: &str) -> ScimResult<ResourceFilter> {
    let expression = expression.trim();
    if expression.is_empty() {
        return Ok(ResourceFilter::All);
    }

    // Bracketed member-selection expressions are not list filters, but a
    // `type` selector on Group members is called out explicitly so clients
    // get a diagnosable failure instead of an empty result. The check reads
    // only the bracketed prefix; whatever follows the selector (a target
    // sub-attribute, a trailing comparison) does not change the verdict.
    if let Some(open) = expression.find('[') {
        let attribute = expression[..open].trim();
        let selector = expression[open + 1..]
            .split_whitespace()
            .next()
            .unwrap_or("");
        if resource_type == "Group"
            && attribute.eq_ignore_ascii_case("members")
            && selector.eq_ignore_ascii_case("type")
        {
            return Err(ScimError::UnsupportedFilterAttribute {
                attribute: "type".to_string(),
                detail: "Group members carry only 'value', 'display', and '$ref' \
                         sub-attributes (RFC 7643 section 4.2); 'type' cannot be \
                         used to select members"
                    .to_string(),
            });
        }
        return Ok(ResourceFilter::All);
    }

    let (attribute, literal) = match parse_equality(expression) {
        Some(parts) => parts,
        None => return Ok(ResourceFilter::All),
    };

    let filter = if attribute.eq_ignore_ascii_case("userName") {
        ResourceFilter::UserNameEq(literal)
    } else if attribute.eq_ignore_ascii_case("displayName") {
        ResourceFilter::DisplayNameEq(literal)
    } else if attribute.eq_ignore_ascii_case("id") {
        ResourceFilter::IdEq(literal)
    } else if attribute.eq_ignore_ascii_case("externalId") {
        ResourceFilter::ExternalIdEq(literal)
    } else {
        ResourceFilter::All
    };
    Ok(filter)
}

/// Split `attr eq "literal"` into its parts; `None` when the expression has
/// any other shape.
fn parse_equality(expression: &str) -> Option<(String, String)> {
    let mut parts = expression.splitn(3, char::is_whitespace);
    let attribute = parts.next()?;
    let operator = parts.next()?;
    let literal = parts.next()?.trim();

    if !operator.eq_ignore_ascii_case("eq") {
        return None;
    }
    let literal = literal.strip_prefix('"')?.strip_suffix('"')?;
    Some((attribute.to_string(), literal.to_string()))
}
