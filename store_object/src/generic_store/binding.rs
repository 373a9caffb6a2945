//! Binding of JSON filter values to sqlx queries
//!
//! Filter and update values travel as `serde_json::Value` and are bound
//! by their JSON shape: strings as `text`, integers that fit as `int4`.
//! A string never changes type because of its content; placeholders for
//! timestamp columns carry a `::timestamptz` cast instead.

/// Bind one `serde_json::Value` to any sqlx query type exposing `.bind`
macro_rules! bind_json_param {
    ($query:expr, $param:expr) => {
        match $param {
            serde_json::Value::String(s) => $query.bind(s),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    if i >= i32::MIN as i64 && i <= i32::MAX as i64 {
                        $query.bind(i as i32)
                    } else {
                        $query.bind(i)
                    }
                } else if let Some(f) = n.as_f64() {
                    $query.bind(f)
                } else {
                    $query.bind(n.to_string())
                }
            }
            serde_json::Value::Bool(b) => $query.bind(b),
            serde_json::Value::Null => $query.bind(Option::<String>::None),
            other => $query.bind(other.to_string()),
        }
    };
}

/// Bind every value in order, as `$1..$n`
macro_rules! bind_json_params {
    ($query:expr, $params:expr) => {{
        let mut query = $query;
        for param in $params {
            query = bind_json_param!(query, param);
        }
        query
    }};
}

pub(crate) use bind_json_param;
pub(crate) use bind_json_params;
