//! Response envelopes and the standard list query.

use serde::{Deserialize, Serialize};

/// Single-item envelope: `{ status, message?, data? }`.
///
/// Some endpoints answer with `success: bool` instead of `status`; both are
/// accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Whether the envelope reports success (either shape).
    pub fn is_success(&self) -> bool {
        match (&self.status, self.success) {
            (Some(status), _) => status == "success",
            (None, Some(success)) => success,
            (None, None) => self.data.is_some(),
        }
    }
}

/// Collection envelope: `{ success, data: [..], pagination? }`.
#[derive(Debug, Clone, Deserialize)]
pub struct ListEnvelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Pagination block returned alongside collections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub total_pages: Option<u32>,
}

/// Standard pagination query accepted by every collection endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u32,
    pub limit: u32,
    pub search: Option<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            search: None,
        }
    }
}

impl ListQuery {
    /// Query pairs in wire order; an empty search is omitted.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("page".to_string(), self.page.to_string()),
            ("limit".to_string(), self.limit.to_string()),
        ];
        if let Some(search) = self.search.as_deref()
            && !search.trim().is_empty()
        {
            pairs.push(("search".to_string(), search.to_string()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_success_accepts_both_shapes() {
        let a: Envelope<serde_json::Value> =
            serde_json::from_str(r#"{"status":"success","data":{}}"#).unwrap();
        assert!(a.is_success());
        let b: Envelope<serde_json::Value> =
            serde_json::from_str(r#"{"success":false,"message":"nope"}"#).unwrap();
        assert!(!b.is_success());
        assert_eq!(b.message.as_deref(), Some("nope"));
    }

    #[test]
    fn list_envelope_tolerates_missing_pagination() {
        let env: ListEnvelope<serde_json::Value> =
            serde_json::from_str(r#"{"success":true,"data":[{"id":1},{"id":2}]}"#).unwrap();
        assert!(env.success);
        assert_eq!(env.data.len(), 2);
        assert!(env.pagination.is_none());
    }

    #[test]
    fn list_query_omits_blank_search() {
        let q = ListQuery {
            search: Some("  ".into()),
            ..ListQuery::default()
        };
        assert_eq!(
            q.to_pairs(),
            vec![
                ("page".to_string(), "1".to_string()),
                ("limit".to_string(), "10".to_string())
            ]
        );

        let q = ListQuery {
            page: 3,
            limit: 25,
            search: Some("cola".into()),
        };
        assert_eq!(q.to_pairs().last().unwrap().1, "cola");
        assert_eq!(q.to_pairs().len(), 3);
    }
}
