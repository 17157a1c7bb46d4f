use crate::constants::binding::MAX_DEPTH;
use crate::contract::{ArgValue, Args, BinaryPart, MethodId, ParamDecl, ParamRole};
use crate::errors::ClientError;
use crate::utils::encoding::{scalar_to_string, value_to_text};
use crate::utils::route::RouteTemplate;
use reqwest::Method;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDescriptor {
    pub name: String,
    pub alias: Option<String>,
    pub roles: Vec<ParamRole>,
    pub path_filter: Vec<String>,
}

impl ParameterDescriptor {
    pub fn key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn has_role(&self, role: ParamRole) -> bool {
        self.roles.contains(&role)
    }

    fn accepts_path_key(&self, key: &str) -> bool {
        self.path_filter.iter().any(|p| p.eq_ignore_ascii_case(key))
    }
}

fn infer_role(verb: &Method) -> ParamRole {
    if *verb == Method::POST || *verb == Method::PUT || *verb == Method::PATCH {
        ParamRole::Body
    } else {
        ParamRole::Query
    }
}

pub fn classify_parameters(
    id: &MethodId,
    route: &RouteTemplate,
    verb: &Method,
    params: &[ParamDecl],
) -> Result<Vec<ParameterDescriptor>, ClientError> {
    let placeholders = route.placeholders();
    let mut consumed: Vec<String> = Vec::new();
    let mut claims: Vec<Option<String>> = Vec::with_capacity(params.len());

    for param in params {
        let eligible = !param.is_annotated() || param.roles.contains(&ParamRole::Path);
        let claim = if eligible {
            placeholders
                .iter()
                .find(|p| {
                    p.eq_ignore_ascii_case(param.key())
                        && !consumed.iter().any(|c| c.eq_ignore_ascii_case(p))
                })
                .cloned()
        } else {
            None
        };
        if let Some(placeholder) = &claim {
            consumed.push(placeholder.clone());
        }
        claims.push(claim);
    }

    let remaining: Vec<String> = placeholders
        .iter()
        .filter(|p| !consumed.iter().any(|c| c.eq_ignore_ascii_case(p)))
        .cloned()
        .collect();

    let mut out = Vec::with_capacity(params.len());
    for (param, claim) in params.iter().zip(claims) {
        let mut roles = Vec::new();
        let mut path_filter = Vec::new();
        if param.is_annotated() {
            for role in &param.roles {
                if *role == ParamRole::Path {
                    if placeholders.is_empty() {
                        return Err(ClientError::configuration(format!(
                            "{}: parameter '{}' is bound to the path but route '{}' has no placeholders",
                            id,
                            param.name,
                            route.template()
                        )));
                    }
                    path_filter = match &claim {
                        Some(placeholder) => vec![placeholder.clone()],
                        None => placeholders.to_vec(),
                    };
                }
                roles.push(*role);
            }
        } else if let Some(placeholder) = claim {
            roles.push(ParamRole::Path);
            path_filter = vec![placeholder];
        } else {
            if !remaining.is_empty() {
                roles.push(ParamRole::Path);
                path_filter = remaining.clone();
            }
            roles.push(infer_role(verb));
        }
        out.push(ParameterDescriptor {
            name: param.name.clone(),
            alias: param.alias.clone(),
            roles,
            path_filter,
        });
    }

    for placeholder in placeholders {
        if !out.iter().any(|p| p.accepts_path_key(placeholder)) {
            return Err(ClientError::configuration(format!(
                "{}: placeholder '{{{}}}' in route '{}' is not bound by any parameter",
                id,
                placeholder,
                route.template()
            ))
            .with_hint("Add a parameter with that name or mark a structured parameter as a path parameter."));
        }
    }

    let body_params: Vec<&str> = out
        .iter()
        .filter(|p| p.has_role(ParamRole::Body))
        .map(|p| p.name.as_str())
        .collect();
    if body_params.len() > 1 {
        return Err(ClientError::configuration(format!(
            "{}: at most one body parameter is allowed, found {}",
            id,
            body_params.join(", ")
        )));
    }

    Ok(out)
}

pub fn extract_pairs(key: &str, value: &Value, remaining_depth: usize) -> Vec<(String, String)> {
    let mut out = Vec::new();
    collect_pairs(key, value, remaining_depth, &mut out);
    out
}

fn collect_pairs(key: &str, value: &Value, remaining_depth: usize, out: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Array(items) => {
            for item in items.iter().filter(|item| !item.is_null()) {
                out.push((key.to_string(), value_to_text(item)));
            }
        }
        Value::Object(fields) => {
            if remaining_depth == 0 {
                return;
            }
            for (field, inner) in fields {
                collect_pairs(field, inner, remaining_depth - 1, out);
            }
        }
        scalar => {
            if let Some(text) = scalar_to_string(scalar) {
                out.push((key.to_string(), text));
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundBody {
    Json { name: String, value: Value },
    Binary { name: String, part: BinaryPart },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundArguments {
    pub path: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub form: Vec<(String, String)>,
    pub files: Vec<(String, BinaryPart)>,
    pub body: Option<BoundBody>,
}

pub fn bind_arguments(
    id: &MethodId,
    params: &[ParameterDescriptor],
    args: &Args,
) -> Result<BoundArguments, ClientError> {
    let mut bound = BoundArguments::default();
    for param in params {
        let Some(arg) = args.get(&param.name) else {
            continue;
        };
        match arg {
            ArgValue::Invalid(message) => {
                return Err(ClientError::serialization(format!(
                    "{}: argument '{}' could not be serialized: {}",
                    id, param.name, message
                )));
            }
            ArgValue::Binary(part) => bind_binary(id, param, part, &mut bound)?,
            ArgValue::Json(value) => bind_json(id, param, value, &mut bound)?,
        }
    }
    Ok(bound)
}

fn bind_binary(
    id: &MethodId,
    param: &ParameterDescriptor,
    part: &BinaryPart,
    bound: &mut BoundArguments,
) -> Result<(), ClientError> {
    for role in &param.roles {
        match role {
            ParamRole::Path => {}
            ParamRole::Query | ParamRole::Header => {
                return Err(ClientError::configuration(format!(
                    "{}: binary argument '{}' cannot be bound as {}",
                    id, param.name, role
                )));
            }
            ParamRole::Body => {
                bound.body = Some(BoundBody::Binary {
                    name: param.key().to_string(),
                    part: part.clone(),
                });
            }
            ParamRole::Form => bound.files.push((param.key().to_string(), part.clone())),
        }
    }
    Ok(())
}

fn bind_json(
    id: &MethodId,
    param: &ParameterDescriptor,
    value: &Value,
    bound: &mut BoundArguments,
) -> Result<(), ClientError> {
    if value.is_null() {
        return Ok(());
    }
    let key = param.key();
    let mut path_keys: Vec<String> = Vec::new();
    if param.has_role(ParamRole::Path) {
        for (name, text) in extract_pairs(key, value, MAX_DEPTH) {
            if param.accepts_path_key(&name) {
                path_keys.push(name.clone());
                bound.path.push((name, text));
            }
        }
        if path_keys.is_empty() && param.roles == [ParamRole::Path] {
            return Err(ClientError::configuration(format!(
                "{}: path parameter '{}' matches no placeholder in the route",
                id, param.name
            ))
            .with_hint("Rename the parameter after a route placeholder or pass a value with matching fields."));
        }
    }
    for role in &param.roles {
        match role {
            ParamRole::Path => {}
            ParamRole::Query => {
                bound.query.extend(
                    extract_pairs(key, value, MAX_DEPTH)
                        .into_iter()
                        .filter(|(name, _)| !path_keys.iter().any(|p| p.eq_ignore_ascii_case(name))),
                );
            }
            ParamRole::Header => bound.headers.extend(extract_pairs(key, value, MAX_DEPTH)),
            ParamRole::Form => bound.form.extend(extract_pairs(key, value, MAX_DEPTH)),
            ParamRole::Body => {
                bound.body = Some(BoundBody::Json {
                    name: key.to_string(),
                    value: value.clone(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{bind_arguments, classify_parameters, extract_pairs};
    use crate::contract::{Args, MethodId, ParamDecl, ParamRole};
    use crate::utils::route::RouteTemplate;
    use reqwest::Method;
    use serde_json::json;

    const ID: MethodId = MethodId::new("Users", "Get");

    #[test]
    fn extract_pairs_flattens_sequences_and_objects() {
        let pairs = extract_pairs("filter", &json!({"name": "a", "tags": ["x", null, "y"], "skip": null}), 5);
        assert_eq!(
            pairs,
            vec![
                ("name".to_string(), "a".to_string()),
                ("tags".to_string(), "x".to_string()),
                ("tags".to_string(), "y".to_string()),
            ]
        );
    }

    #[test]
    fn extract_pairs_stops_at_depth_limit() {
        let value = json!({"a": {"b": {"c": 1}}, "d": 2});
        assert_eq!(extract_pairs("x", &value, 2), vec![("d".to_string(), "2".to_string())]);
        assert!(extract_pairs("x", &value, 0).is_empty());
        assert_eq!(extract_pairs("n", &json!(3), 0), vec![("n".to_string(), "3".to_string())]);
    }

    #[test]
    fn structured_array_elements_are_compact_json() {
        let pairs = extract_pairs("items", &json!([{"a": 1}, 2]), 5);
        assert_eq!(pairs[0].1, r#"{"a":1}"#);
        assert_eq!(pairs[1].1, "2");
    }

    #[test]
    fn unannotated_name_match_is_path_only() {
        let route = RouteTemplate::parse("/users/{id}");
        let params = classify_parameters(&ID, &route, &Method::GET, &[ParamDecl::new("id")])
            .expect("classified");
        assert_eq!(params[0].roles, vec![ParamRole::Path]);
        assert_eq!(params[0].path_filter, vec!["id".to_string()]);
    }

    #[test]
    fn unannotated_post_parameter_becomes_body() {
        let route = RouteTemplate::parse("/users");
        let params = classify_parameters(&ID, &route, &Method::POST, &[ParamDecl::new("user")])
            .expect("classified");
        assert_eq!(params[0].roles, vec![ParamRole::Body]);
    }

    #[test]
    fn alias_matches_placeholder() {
        let route = RouteTemplate::parse("/users/{user_id}");
        let params = classify_parameters(
            &ID,
            &route,
            &Method::GET,
            &[ParamDecl::path("id").alias("user_id")],
        )
        .expect("classified");
        assert_eq!(params[0].path_filter, vec!["user_id".to_string()]);
    }

    #[test]
    fn explicit_path_value_without_a_matching_slot_is_rejected() {
        let route = RouteTemplate::parse("items/{id}");
        let params = classify_parameters(
            &ID,
            &route,
            &Method::GET,
            &[ParamDecl::new("id"), ParamDecl::path("other")],
        )
        .expect("classified");
        assert_eq!(params[1].roles, vec![ParamRole::Path]);

        let err = bind_arguments(&ID, &params, &Args::new().arg("id", &1).arg("other", &99))
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.message.contains("'other'"));

        let bound = bind_arguments(
            &ID,
            &params,
            &Args::new().arg("id", &1).arg("other", &json!({"id": 2})),
        )
        .expect("structural match");
        assert_eq!(bound.path.len(), 2);
    }
}
