//! FIPS endpoint check on a saved plan.

use serde_json::Value;

use crate::error::{IacError, IacResult};

/// Whether the plan configures an `aws` provider with
/// `use_fips_endpoint = true` as a constant.
pub fn uses_fips_endpoint(plan: &Value) -> bool {
    let providers = match plan
        .pointer("/configuration/provider_config")
        .and_then(Value::as_object)
    {
        Some(providers) => providers,
        None => return false,
    };

    providers
        .values()
        .filter(|provider| provider.get("name").and_then(Value::as_str) == Some("aws"))
        .any(|provider| {
            provider.pointer("/expressions/use_fips_endpoint/constant_value")
                == Some(&Value::Bool(true))
        })
}

/// Fail with [`IacError::ComplianceFailed`] unless the plan uses FIPS endpoints.
pub fn ensure_fips(target: &str, plan: &Value) -> IacResult<()> {
    if uses_fips_endpoint(plan) {
        Ok(())
    } else {
        Err(IacError::ComplianceFailed {
            target: target.to_string(),
        })
    }
}
