//! Set membership predicates

use super::{PredicateContext, check_min_params};
use crate::error::MatcherResult;
use crate::value::Value;

/// Candidates of `in`/`not_in`: a single collection parameter is the list,
/// otherwise the parameters themselves.
fn candidates(params: &[Value]) -> Box<dyn Iterator<Item = &Value> + '_> {
    match params {
        [single] if single.is_collection() => single.members(),
        many => Box::new(many.iter()),
    }
}

fn is_member(value: &Value, params: &[Value]) -> bool {
    candidates(params).any(|candidate| value.loose_eq(candidate))
}

/// Loose membership
pub fn in_list(value: &Value, params: &[Value], ctx: &PredicateContext<'_>) -> MatcherResult<bool> {
    check_min_params(ctx, params, 1)?;
    Ok(is_member(value, params))
}

pub fn not_in_list(
    value: &Value,
    params: &[Value],
    ctx: &PredicateContext<'_>,
) -> MatcherResult<bool> {
    check_min_params(ctx, params, 1)?;
    Ok(!is_member(value, params))
}
