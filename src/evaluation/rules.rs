use crate::models::{ContextValue, EvaluationContext, RuleOp, RuleValue, TargetRule};

/// AND over `rules`; an empty list matches every context.
pub fn matches_rules(rules: &[TargetRule], context: &EvaluationContext) -> bool {
    rules.iter().all(|rule| matches_rule(rule, context))
}

fn matches_rule(rule: &TargetRule, context: &EvaluationContext) -> bool {
    let actual = context.get(&rule.attribute);

    match rule.op {
        RuleOp::Eq => strictly_equal(actual, &rule.value),
        RuleOp::Neq => !strictly_equal(actual, &rule.value),
        // membership requires a list; anything else never matches
        RuleOp::In => match &rule.value {
            RuleValue::List(values) => contains(values, actual),
            RuleValue::Scalar(_) => false,
        },
        RuleOp::Nin => match &rule.value {
            RuleValue::List(values) => !contains(values, actual),
            RuleValue::Scalar(_) => false,
        },
    }
}

fn strictly_equal(actual: Option<&ContextValue>, expected: &RuleValue) -> bool {
    match (actual, expected) {
        (Some(actual), RuleValue::Scalar(expected)) => actual == expected,
        _ => false,
    }
}

fn contains(values: &[ContextValue], actual: Option<&ContextValue>) -> bool {
    match actual {
        Some(actual) => values.contains(actual),
        None => false,
    }
}
