use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use klox::interpreter::Interpreter;
use klox::parser::Parser;
use klox::resolver::Resolver;
use klox::scanner::Scanner;
use klox::token::Token;

/// Shared in-memory sink standing in for stdout.
#[derive(Clone, Default)]
struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SharedBuf {
    fn contents(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).unwrap()
    }
}

/// Run a program through the whole pipeline; returns what it printed and the
/// rendered runtime error, if any.
fn run(source: &str) -> (String, Option<String>) {
    let buf = SharedBuf::default();
    let mut interpreter = Interpreter::with_output(Box::new(buf.clone()));

    let tokens: Vec<Token> = Scanner::new(source).filter_map(Result::ok).collect();

    let (statements, parse_errors) = Parser::new(tokens).parse();
    assert!(
        parse_errors.is_empty(),
        "unexpected parse errors: {:?}",
        parse_errors
    );

    let resolve_errors = Resolver::new(&mut interpreter).resolve(&statements);
    assert!(
        resolve_errors.is_empty(),
        "unexpected resolve errors: {:?}",
        resolve_errors
    );

    let runtime_error = interpreter
        .interpret(&statements)
        .err()
        .map(|e| e.to_string());

    (buf.contents(), runtime_error)
}

fn run_ok(source: &str) -> String {
    let (output, runtime_error) = run(source);
    assert_eq!(runtime_error, None, "unexpected runtime error");
    output
}

fn run_err(source: &str) -> (String, String) {
    let (output, runtime_error) = run(source);
    (output, runtime_error.expect("expected a runtime error"))
}

#[test]
fn hello_world() {
    assert_eq!(run_ok("print \"Hello, world!\";"), "Hello, world!\n");
}

#[test]
fn nested_lexical_scoping() {
    let source = "\
var a = \"global a\";
var b = \"global b\";
var c = \"global c\";
{
  var a = \"outer a\";
  var b = \"outer b\";
  {
    var a = \"inner a\";
    print a;
    print b;
    print c;
  }
  print a;
  print b;
  print c;
}
print a;
print b;
print c;
";

    assert_eq!(
        run_ok(source),
        "inner a\nouter b\nglobal c\nouter a\nouter b\nglobal c\nglobal a\nglobal b\nglobal c\n"
    );
}

#[test]
fn iterative_fibonacci() {
    let source = "\
var a = 0;
var temp;
for (var b = 1; a < 1000; b = temp + b) {
  print a;
  temp = a;
  a = b;
}
";

    let expected = [
        0, 1, 1, 2, 3, 5, 8, 13, 21, 34, 55, 89, 144, 233, 377, 610, 987,
    ]
    .iter()
    .map(|n| format!("{}\n", n))
    .collect::<String>();

    assert_eq!(run_ok(source), expected);
}

#[test]
fn counter_closures_share_their_defining_scope() {
    let source = "\
fun makeCounter() {
  var i = 0;
  fun count() {
    i = i + 1;
    print i;
  }
  return count;
}
var counter = makeCounter();
counter();
counter();
";

    assert_eq!(run_ok(source), "1\n2\n");
}

#[test]
fn separate_invocations_get_fresh_state() {
    let source = "\
fun makeCounter() {
  var i = 0;
  fun count() {
    i = i + 1;
    print i;
  }
  return count;
}
var first = makeCounter();
first();
first();
var second = makeCounter();
second();
";

    assert_eq!(run_ok(source), "1\n2\n1\n");
}

#[test]
fn closures_capture_the_scope_at_declaration_time() {
    let source = "\
var a = \"global\";
{
  fun showA() {
    print a;
  }
  showA();
  var a = \"block\";
  showA();
}
";

    assert_eq!(run_ok(source), "global\nglobal\n");
}

#[test]
fn super_dispatches_to_the_parent_method() {
    let source = "\
class Doughnut {
  cook() {
    print \"Fry until golden brown.\";
  }
}
class BostonCream < Doughnut {
  cook() {
    super.cook();
    print \"Pipe full of custard and coat with chocolate.\";
  }
}
BostonCream().cook();
";

    assert_eq!(
        run_ok(source),
        "Fry until golden brown.\nPipe full of custard and coat with chocolate.\n"
    );
}

#[test]
fn methods_are_inherited_through_the_superchain() {
    let source = "\
class A { m() { print \"from A\"; } }
class B < A {}
class C < B {}
C().m();
";

    assert_eq!(run_ok(source), "from A\n");
}

#[test]
fn this_binds_to_the_receiving_instance() {
    let source = "\
class Cake {
  taste() {
    var adjective = \"delicious\";
    print \"The \" + this.flavor + \" cake is \" + adjective + \"!\";
  }
}
var cake = Cake();
cake.flavor = \"German chocolate\";
cake.taste();
";

    assert_eq!(run_ok(source), "The German chocolate cake is delicious!\n");
}

#[test]
fn detached_methods_stay_bound() {
    let source = "\
class Person {
  sayName() {
    print this.name;
  }
}
var jane = Person();
jane.name = \"Jane\";
var method = jane.sayName;
method();
";

    assert_eq!(run_ok(source), "Jane\n");
}

#[test]
fn initializers_run_and_always_return_the_instance() {
    let source = "\
class Point {
  init(x, y) {
    this.x = x;
    this.y = y;
  }
}
var p = Point(3, 4);
print p.x + p.y;
print p.init(0, 0) == p;
";

    assert_eq!(run_ok(source), "7\ntrue\n");
}

#[test]
fn early_return_in_an_initializer_still_yields_the_instance() {
    let source = "\
class Guard {
  init(ok) {
    if (!ok) return;
    this.armed = true;
  }
}
print Guard(false);
";

    assert_eq!(run_ok(source), "Guard instance\n");
}

#[test]
fn number_formatting_trims_integral_fractions() {
    assert_eq!(run_ok("print 1.0; print 1.5; print 2 + 2;"), "1\n1.5\n4\n");
}

#[test]
fn string_concatenation_and_arithmetic() {
    assert_eq!(
        run_ok("print \"foo\" + \"bar\"; print 10 - 4 / 2;"),
        "foobar\n8\n"
    );
}

#[test]
fn truthiness_treats_only_nil_and_false_as_falsy() {
    let source = "\
if (0) print \"zero\";
if (\"\") print \"empty\";
if (nil) print \"nil\"; else print \"no nil\";
if (false) print \"false\"; else print \"no false\";
";

    assert_eq!(run_ok(source), "zero\nempty\nno nil\nno false\n");
}

#[test]
fn logical_operators_short_circuit_to_operand_values() {
    let source = "\
print \"hi\" or 2;
print nil or \"yes\";
print nil and \"never\";
print 1 and 2;
";

    assert_eq!(run_ok(source), "hi\nyes\nnil\n2\n");
}

#[test]
fn equality_is_by_value_for_scalars_and_identity_for_objects() {
    let source = "\
print nil == nil;
print nil == false;
print 1 == 1;
print \"a\" == \"a\";
fun f() {}
print f == f;
class C {}
print C() == C();
";

    assert_eq!(run_ok(source), "true\nfalse\ntrue\ntrue\ntrue\nfalse\n");
}

#[test]
fn stringification_of_callables_and_instances() {
    let source = "\
class Foo {}
fun bar() {}
print Foo;
print Foo();
print bar;
print clock;
";

    assert_eq!(run_ok(source), "Foo\nFoo instance\n<fn bar>\n<native fn>\n");
}

#[test]
fn clock_returns_a_nonnegative_number_of_seconds() {
    assert_eq!(run_ok("print clock() >= 0;"), "true\n");
}

#[test]
fn assignment_is_an_expression_yielding_its_value() {
    assert_eq!(run_ok("var a = 1;\nprint a = 2;\nprint a;"), "2\n2\n");
}

#[test]
fn while_loops_reevaluate_their_condition() {
    let source = "\
var n = 3;
while (n > 0) {
  print n;
  n = n - 1;
}
";

    assert_eq!(run_ok(source), "3\n2\n1\n");
}

#[test]
fn assigning_an_undefined_global_is_a_runtime_error() {
    let (output, error) = run_err("unknown = 1;");

    assert_eq!(output, "");
    assert_eq!(error, "Undefined variable 'unknown'.\n[line 1]");
}

#[test]
fn reading_an_undefined_global_is_a_runtime_error() {
    let (_, error) = run_err("print missing;");

    assert_eq!(error, "Undefined variable 'missing'.\n[line 1]");
}

#[test]
fn calling_a_non_callable_is_a_runtime_error() {
    let (_, error) = run_err("\"totally not a function\"();");

    assert_eq!(error, "Can only call functions and classes.\n[line 1]");
}

#[test]
fn arity_mismatches_are_runtime_errors() {
    let (_, error) = run_err("fun f(a, b) {}\nf(1);");

    assert_eq!(error, "Expected 2 arguments but got 1.\n[line 2]");
}

#[test]
fn unary_and_binary_type_errors() {
    let (_, error) = run_err("print -\"muffin\";");
    assert_eq!(error, "Operand must be a number.\n[line 1]");

    let (_, error) = run_err("print 1 < \"two\";");
    assert_eq!(error, "Operands must be numbers.\n[line 1]");

    let (_, error) = run_err("print 1 + \"two\";");
    assert_eq!(error, "Operands must be two numbers or two strings.\n[line 1]");
}

#[test]
fn property_access_requires_instances() {
    let (_, error) = run_err("print 4.denominator;");
    assert_eq!(error, "Only instances have properties.\n[line 1]");

    let (_, error) = run_err("4.denominator = 1;");
    assert_eq!(error, "Only instances have fields.\n[line 1]");
}

#[test]
fn missing_properties_and_methods_are_runtime_errors() {
    let (_, error) = run_err("class Empty {}\nprint Empty().ghost;");
    assert_eq!(error, "Undefined property 'ghost'.\n[line 2]");

    let source = "\
class Base {}
class Derived < Base {
  m() { return super.ghost(); }
}
Derived().m();
";
    let (_, error) = run_err(source);
    assert_eq!(error, "Undefined property 'ghost'.\n[line 3]");
}

#[test]
fn inheriting_from_a_non_class_is_a_runtime_error() {
    let (_, error) = run_err("var NotAClass = \"so not a class\";\nclass Oops < NotAClass {}");

    assert_eq!(error, "Superclass must be a class.\n[line 2]");
}

#[test]
fn runtime_errors_stop_execution_at_the_failing_statement() {
    let (output, error) = run_err("print \"before\";\nprint missing;\nprint \"after\";");

    assert_eq!(output, "before\n");
    assert_eq!(error, "Undefined variable 'missing'.\n[line 2]");
}

#[test]
fn return_unwinds_nested_blocks_and_loops() {
    let source = "\
fun find() {
  for (var i = 0; i < 10; i = i + 1) {
    if (i == 3) {
      return i;
    }
  }
  return -1;
}
print find();
";

    assert_eq!(run_ok(source), "3\n");
}

#[test]
fn functions_without_a_return_yield_nil() {
    assert_eq!(run_ok("fun quiet() {}\nprint quiet();"), "nil\n");
}

#[test]
fn recursion_works_through_the_declaring_scope() {
    let source = "\
fun fib(n) {
  if (n < 2) return n;
  return fib(n - 1) + fib(n - 2);
}
print fib(10);
";

    assert_eq!(run_ok(source), "55\n");
}
