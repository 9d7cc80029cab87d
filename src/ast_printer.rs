use crate::ast::{Expr, FunctionDecl, Stmt};
use crate::token::TokenType;

/// Renders a parsed tree back to source text.
///
/// The output re-parses to a structurally equivalent tree: expressions are
/// printed bare (parentheses come only from `Grouping` nodes), statements one
/// per line.  This backs `--debug` output and the round-trip tests.
pub struct Ast;

impl Ast {
    pub fn print(&self, expr: &Expr) -> String {
        match expr {
            Expr::Literal(token) => match &token.token_type {
                TokenType::NUMBER(n) => {
                    if n.fract() == 0.0 {
                        format!("{:.0}", n)
                    } else {
                        n.to_string()
                    }
                }

                TokenType::STRING(s) => format!("\"{}\"", s),

                TokenType::TRUE => "true".to_string(),

                TokenType::FALSE => "false".to_string(),

                TokenType::NIL => "nil".to_string(),

                _ => unreachable!("non-literal token in Literal node"),
            },

            Expr::Unary { operator, right } => {
                format!("{}{}", operator.lexeme, self.print(right))
            }

            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => format!(
                "{} {} {}",
                self.print(left),
                operator.lexeme,
                self.print(right)
            ),

            Expr::Grouping(inner) => format!("({})", self.print(inner)),

            Expr::Variable { name, .. } => name.lexeme.clone(),

            Expr::Assign { name, value, .. } => {
                format!("{} = {}", name.lexeme, self.print(value))
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                let args: Vec<String> = arguments.iter().map(|a| self.print(a)).collect();

                format!("{}({})", self.print(callee), args.join(", "))
            }

            Expr::Get { object, name } => format!("{}.{}", self.print(object), name.lexeme),

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "{}.{} = {}",
                self.print(object),
                name.lexeme,
                self.print(value)
            ),

            Expr::This { .. } => "this".to_string(),

            Expr::Super { method, .. } => format!("super.{}", method.lexeme),
        }
    }

    pub fn print_stmt(&self, stmt: &Stmt) -> String {
        match stmt {
            Stmt::Expression(expr) => format!("{};", self.print(expr)),

            Stmt::Print(expr) => format!("print {};", self.print(expr)),

            Stmt::Var { name, initializer } => {
                format!("var {} = {};", name.lexeme, self.print(initializer))
            }

            Stmt::Block(statements) => self.print_block(statements),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let mut out = format!(
                    "if ({}) {}",
                    self.print(condition),
                    self.print_stmt(then_branch)
                );

                if let Some(else_branch) = else_branch {
                    out.push_str(&format!(" else {}", self.print_stmt(else_branch)));
                }

                out
            }

            Stmt::While { condition, body } => {
                format!("while ({}) {}", self.print(condition), self.print_stmt(body))
            }

            Stmt::Function(declaration) => format!("fun {}", self.print_function(declaration)),

            Stmt::Return { value, .. } => match value {
                Some(expr) => format!("return {};", self.print(expr)),
                None => "return;".to_string(),
            },

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let mut out = format!("class {} ", name.lexeme);

                if let Some(Expr::Variable {
                    name: super_name, ..
                }) = superclass
                {
                    out.push_str(&format!("< {} ", super_name.lexeme));
                }

                let rendered: Vec<String> =
                    methods.iter().map(|m| self.print_function(m)).collect();

                out.push_str(&format!("{{ {} }}", rendered.join(" ")));

                out
            }
        }
    }

    fn print_function(&self, declaration: &FunctionDecl) -> String {
        let params: Vec<String> = declaration
            .params
            .iter()
            .map(|p| p.lexeme.clone())
            .collect();

        format!(
            "{}({}) {}",
            declaration.name.lexeme,
            params.join(", "),
            self.print_block(&declaration.body)
        )
    }

    fn print_block(&self, statements: &[Stmt]) -> String {
        let rendered: Vec<String> = statements.iter().map(|s| self.print_stmt(s)).collect();

        format!("{{ {} }}", rendered.join(" "))
    }
}
