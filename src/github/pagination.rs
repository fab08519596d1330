//! `Link` header parsing (RFC 8288) for GitHub list endpoints.

/// One `<uri>; param=value` entry of a `Link` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub url: String,
    pub rels: Vec<String>,
}

impl Link {
    pub fn has_rel(&self, rel: &str) -> bool {
        self.rels.iter().any(|r| r.eq_ignore_ascii_case(rel))
    }
}

/// Parses every entry of a `Link` header value. Malformed trailing input is
/// ignored rather than rejected.
pub fn parse_link_header(value: &str) -> Vec<Link> {
    let mut links = Vec::new();
    let mut rest = value;

    while let Some(start) = rest.find('<') {
        let after_start = &rest[start + 1..];
        let Some(end) = after_start.find('>') else {
            break;
        };
        let url = after_start[..end].trim().to_string();
        let after_url = &after_start[end + 1..];

        // Parameters run until the next entry's opening bracket.
        let params_end = after_url.find('<').unwrap_or(after_url.len());
        let params = &after_url[..params_end];

        let rels = params
            .split(';')
            .filter_map(|param| {
                let (key, value) = param.split_once('=')?;
                if !key.trim().eq_ignore_ascii_case("rel") {
                    return None;
                }
                let value = value.trim().trim_end_matches(',').trim();
                Some(value.trim_matches('"').to_string())
            })
            .flat_map(|value| {
                value
                    .split_whitespace()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect();

        links.push(Link { url, rels });
        rest = &after_url[params_end..];
    }

    links
}

/// The `rel="next"` target of a `Link` header, if any.
pub fn next_link(value: &str) -> Option<String> {
    parse_link_header(value)
        .into_iter()
        .find(|link| link.has_rel("next"))
        .map(|link| link.url)
}
