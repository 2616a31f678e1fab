// Shapeshift Declaration Bodies
// Typed statement/expression IR attached to generic declarations

use crate::ast::CallSiteId;
use crate::types::Type;

/// Body of a generic declaration
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Body {
    pub statements: Vec<Statement>,
}

impl Body {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Visit every type guard in this body, including nested ones
    pub fn type_guards(&self) -> Vec<&TypeGuard> {
        let mut guards = Vec::new();
        collect_guards(&self.statements, &mut guards);
        guards
    }

    /// Call sites referenced from this body, in source order
    pub fn call_sites(&self) -> Vec<CallSiteId> {
        let mut sites = Vec::new();
        for statement in &self.statements {
            statement.collect_call_sites(&mut sites);
        }
        sites
    }
}

fn collect_guards<'a>(statements: &'a [Statement], guards: &mut Vec<&'a TypeGuard>) {
    for statement in statements {
        match statement {
            Statement::TypeGuard(guard) => {
                guards.push(guard);
                collect_guards(&guard.then_branch, guards);
                collect_guards(&guard.else_branch, guards);
            }
            Statement::Block(inner) => collect_guards(inner, guards),
            _ => {}
        }
    }
}

/// Statement forms relevant to specialization
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Let {
        name: String,
        ty: Type,
        value: Expression,
    },
    Return(Option<Expression>),
    Expression(Expression),
    /// `if (subject is test) { .. } else { .. }` narrowing on a type
    TypeGuard(TypeGuard),
    Block(Vec<Statement>),
}

impl Statement {
    fn collect_call_sites(&self, sites: &mut Vec<CallSiteId>) {
        match self {
            Statement::Let { value, .. } => value.collect_call_sites(sites),
            Statement::Return(Some(value)) | Statement::Expression(value) => {
                value.collect_call_sites(sites)
            }
            Statement::Return(None) => {}
            Statement::TypeGuard(guard) => {
                guard.subject.collect_call_sites(sites);
                for statement in guard.then_branch.iter().chain(&guard.else_branch) {
                    statement.collect_call_sites(sites);
                }
            }
            Statement::Block(statements) => {
                for statement in statements {
                    statement.collect_call_sites(sites);
                }
            }
        }
    }
}

/// Branch on whether `subject`'s type is assignable to `test`
#[derive(Debug, Clone, PartialEq)]
pub struct TypeGuard {
    pub subject: Expression,
    pub test: Type,
    pub then_branch: Vec<Statement>,
    pub else_branch: Vec<Statement>,
}

/// Literal values appearing in bodies
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    String(String),
    Number(String),
    Boolean(bool),
    Null,
    Undefined,
}

/// Typed expressions
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal {
        value: LiteralValue,
        ty: Type,
    },
    Variable {
        name: String,
        ty: Type,
    },
    Property {
        object: Box<Expression>,
        name: String,
        ty: Type,
    },
    ObjectLiteral {
        properties: Vec<(String, Expression)>,
        ty: Type,
    },
    ArrayLiteral {
        elements: Vec<Expression>,
        ty: Type,
    },
    /// Call of a generic declaration, recorded as a call site
    Call {
        call_site: CallSiteId,
        callee: String,
        arguments: Vec<Expression>,
        ty: Type,
    },
    Cast {
        value: Box<Expression>,
        ty: Type,
    },
}

impl Expression {
    pub fn variable(name: impl Into<String>, ty: Type) -> Self {
        Expression::Variable {
            name: name.into(),
            ty,
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        let value = value.into();
        Expression::Literal {
            ty: Type::string_literal(value.clone()),
            value: LiteralValue::String(value),
        }
    }

    pub fn number(value: impl ToString) -> Self {
        let value = value.to_string();
        Expression::Literal {
            ty: Type::number_literal(value.clone()),
            value: LiteralValue::Number(value),
        }
    }

    pub fn property(object: Expression, name: impl Into<String>, ty: Type) -> Self {
        Expression::Property {
            object: Box::new(object),
            name: name.into(),
            ty,
        }
    }

    /// The checker-resolved type of this expression
    pub fn ty(&self) -> &Type {
        match self {
            Expression::Literal { ty, .. }
            | Expression::Variable { ty, .. }
            | Expression::Property { ty, .. }
            | Expression::ObjectLiteral { ty, .. }
            | Expression::ArrayLiteral { ty, .. }
            | Expression::Call { ty, .. }
            | Expression::Cast { ty, .. } => ty,
        }
    }

    fn collect_call_sites(&self, sites: &mut Vec<CallSiteId>) {
        match self {
            Expression::Call {
                call_site,
                arguments,
                ..
            } => {
                sites.push(*call_site);
                arguments.iter().for_each(|a| a.collect_call_sites(sites));
            }
            Expression::Property { object, .. } => object.collect_call_sites(sites),
            Expression::ObjectLiteral { properties, .. } => {
                properties
                    .iter()
                    .for_each(|(_, value)| value.collect_call_sites(sites));
            }
            Expression::ArrayLiteral { elements, .. } => {
                elements.iter().for_each(|e| e.collect_call_sites(sites));
            }
            Expression::Cast { value, .. } => value.collect_call_sites(sites),
            Expression::Literal { .. } | Expression::Variable { .. } => {}
        }
    }
}
