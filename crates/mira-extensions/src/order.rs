//! Presentation order of extension routes.
//!
//! Routes sort ascending by explicit `order` (999 when absent), then group tag,
//! then title. The sort is stable, so equal keys keep their synthesis order.

use std::cmp::Ordering;

use crate::config::defaults;
use crate::synth::ResolvedRoute;

/// Sort routes for menu and tab presentation.
pub fn order_routes(mut routes: Vec<ResolvedRoute>) -> Vec<ResolvedRoute> {
    routes.sort_by(compare_routes);
    routes
}

/// Total order over routes.
pub fn compare_routes(a: &ResolvedRoute, b: &ResolvedRoute) -> Ordering {
    let order_a = a.meta.order.unwrap_or(defaults::ORDER);
    let order_b = b.meta.order.unwrap_or(defaults::ORDER);

    order_a
        .total_cmp(&order_b)
        .then_with(|| a.group_tag().cmp(b.group_tag()))
        .then_with(|| locale_compare(a.title(), b.title()))
}

/// Case-insensitive comparison with lowercase before uppercase on ties,
/// falling back to code point order so distinct strings never compare equal.
pub fn locale_compare(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));

    folded
        .then_with(|| {
            a.chars()
                .zip(b.chars())
                .find(|(x, y)| x != y)
                .map(|(x, y)| match (x.is_lowercase(), y.is_lowercase()) {
                    (true, false) => Ordering::Less,
                    (false, true) => Ordering::Greater,
                    _ => Ordering::Equal,
                })
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.cmp(b))
}
