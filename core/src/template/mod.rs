//! Rename template language.
//!
//! A template is literal text with `{expression}` placeholders; `{{` and `}}`
//! produce literal braces. An expression is a context field (`Name`,
//! `.Source`, `Path`, ...), a string or integer literal, a function call, or
//! a pipeline `expr | func(args)` that passes `expr` as the first argument.
//!
//! Templates are compiled once with [`RenameTemplate::parse`], which rejects
//! syntax errors, unknown fields, unknown functions and wrong argument
//! counts. Rendering a compiled template is total.

mod context;
mod functions;
mod parse;

use std::fmt;
use std::str::FromStr;

pub use context::RenameContext;

use crate::error::TemplateError;
use functions::Value;
use parse::{Expr, Segment};

/// A compiled rename template.
///
/// # Examples
///
/// ```
/// use apijoin_core::{RenameContext, RenameTemplate};
///
/// let template = RenameTemplate::parse("{Name}_{Source | pascalCase}").unwrap();
/// let context = RenameContext::new("User", "order-service", 1);
/// assert_eq!(template.render(&context), "User_OrderService");
///
/// let fallback = RenameTemplate::parse(r#"{default(OperationID, "Shared")}{Name}"#).unwrap();
/// assert_eq!(fallback.render(&context), "SharedUser");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RenameTemplate {
    text: String,
    segments: Vec<Segment>,
}

impl RenameTemplate {
    /// Compiles `text`.
    pub fn parse(text: &str) -> Result<Self, TemplateError> {
        Ok(Self {
            text: text.to_string(),
            segments: parse::parse(text)?,
        })
    }

    /// The source text of the template.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Returns `true` when the template reads any operation-derived field.
    pub fn uses_operation_context(&self) -> bool {
        fn reads_operation(expr: &Expr) -> bool {
            match expr {
                Expr::Field(field) => !matches!(
                    field,
                    parse::Field::Name | parse::Field::Source | parse::Field::Index
                ),
                Expr::Call { args, .. } => args.iter().any(reads_operation),
                Expr::Str(_) | Expr::Int(_) => false,
            }
        }
        self.segments.iter().any(|segment| match segment {
            Segment::Expr(expr) => reads_operation(expr),
            Segment::Literal(_) => false,
        })
    }

    /// Evaluates the template against `context`.
    pub fn render(&self, context: &RenameContext) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Expr(expr) => out.push_str(&evaluate(expr, context).to_string()),
            }
        }
        out
    }
}

impl FromStr for RenameTemplate {
    type Err = TemplateError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::parse(text)
    }
}

impl fmt::Display for RenameTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn evaluate(expr: &Expr, context: &RenameContext) -> Value {
    match expr {
        Expr::Field(field) => context.field(*field),
        Expr::Str(text) => Value::Str(text.clone()),
        Expr::Int(value) => Value::Int(*value),
        Expr::Call { function, args } => {
            let args = args.iter().map(|arg| evaluate(arg, context)).collect();
            functions::call(*function, args)
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::config::PrimaryOperationPolicy;
    use crate::graph::{Lineage, LineageOperation, OperationRef, UsageType};
    use crate::types::Method;

    fn context_with_operation() -> RenameContext {
        let lineage = Lineage {
            operations: vec![LineageOperation {
                operation: OperationRef {
                    path: "/orders/{orderId}/items".to_string(),
                    method: Method::Post,
                    operation_id: Some("addOrderItem".to_string()),
                    tags: vec!["orders".to_string(), "items".to_string()],
                    order: 0,
                },
                usage: UsageType::Request,
                status_code: None,
                param_name: None,
                media_type: Some("application/json".to_string()),
            }],
        };
        RenameContext::new("Item", "orders", 1)
            .with_lineage(&lineage, PrimaryOperationPolicy::FirstEncountered)
    }

    fn render(template: &str, context: &RenameContext) -> String {
        RenameTemplate::parse(template).unwrap().render(context)
    }

    #[test]
    fn test_default_template_renders_name_and_source() {
        let context = RenameContext::new("User", "orders", 1);
        assert_eq!(render(crate::DEFAULT_RENAME_TEMPLATE, &context), "User_orders");
    }

    #[test]
    fn test_operation_fields_and_functions() {
        let context = context_with_operation();
        assert_eq!(render("{PrimaryResource | pascalCase}{Name}", &context), "OrdersItem");
        assert_eq!(render("{Path | pathLast | pascalCase}_{Name}", &context), "Items_Item");
        assert_eq!(render("{Method}{pathClean(Path)}", &context), "POSTorders_orderId_items");
        assert_eq!(render("{OperationID | pascalCase}{Name}", &context), "AddOrderItemItem");
        assert_eq!(render(r#"{joinTags(Tags, "_")}"#, &context), "orders_items");
        assert_eq!(render("{Path | pathSegment(-1)}", &context), "items");
        assert_eq!(render("{UsageType}:{MediaType}", &context), "request:application/json");
        assert_eq!(render(r#"{cond(IsShared, "Shared", "Own")}"#, &context), "Own");
    }

    #[test]
    fn test_empty_context_fields_flow_into_functions() {
        let context = RenameContext::new("User", "orders", 1);
        assert_eq!(render("{Path | pathResource | pascalCase}{Name}", &context), "User");
        assert_eq!(render(r#"{coalesce(OperationID, Tags, Source)}_{Name}"#, &context), "orders_User");
        assert_eq!(render("{firstTag(Tags)}", &context), "");
        assert_eq!(render("{RefCount}", &context), "0");
    }

    #[test]
    fn test_literal_braces_render() {
        let context = RenameContext::new("User", "orders", 1);
        assert_eq!(render("{{{Name}}}", &context), "{User}");
    }

    #[test]
    fn test_uses_operation_context() {
        assert!(!RenameTemplate::parse("{Name}_{Source}").unwrap().uses_operation_context());
        assert!(RenameTemplate::parse("{pascalCase(Path)}{Name}").unwrap().uses_operation_context());
    }

    #[test]
    fn test_from_str_reports_template_errors() {
        let err = "{Name".parse::<RenameTemplate>().unwrap_err();
        assert!(err.to_string().contains("{Name"));
    }

    fn arb_context() -> impl Strategy<Value = RenameContext> {
        (
            "[A-Za-z_]{0,12}",
            "[a-z./-]{0,12}",
            "(/[a-z{}]{0,6}){0,4}",
            prop::collection::vec("[a-z]{0,5}", 0..3),
            0usize..5,
        )
            .prop_map(|(name, source, path, tags, index)| RenameContext {
                name,
                source,
                index,
                path,
                tags,
                ..Default::default()
            })
    }

    proptest! {
        #[test]
        fn prop_parse_never_panics(text in "\\PC{0,40}") {
            let _ = RenameTemplate::parse(&text);
        }

        #[test]
        fn prop_render_is_total(
            context in arb_context(),
            template in prop::sample::select(vec![
                "{Name}_{Source}",
                "{Path | pathSegment(-2) | snakeCase}",
                "{pathResource(Path) | pascalCase}{Name | camelCase}",
                "{pathLast(Path)}{pathClean(Path)}",
                "{coalesce(OperationID, firstTag(Tags), Source)}",
                r#"{joinTags(Tags, "-") | kebabCase}{hasTag(Tags, "a")}"#,
                r#"{replace(Name, "_", "") | upper}{trimPrefix(Source, "a")}"#,
                r#"{pathSegment(Path, Source)}{default(Method, "none")}"#,
            ]),
        ) {
            let compiled = RenameTemplate::parse(template).unwrap();
            let first = compiled.render(&context);
            prop_assert_eq!(first, compiled.render(&context));
        }
    }
}
