use std::{cell::RefCell, collections::HashMap, rc::Rc};

use quill::{ast::{Block, FuncDecl, Var},
            interpreter::{evaluator::builtin, lexer::Pos, parser::core::Parser, types::Type}};

fn parse(input: &str) -> (String, Vec<String>) {
    parse_with(input, builtin::declarations())
}

fn parse_with(input: &str, builtins: HashMap<String, Rc<FuncDecl>>) -> (String, Vec<String>) {
    let (program, errors) = Parser::new(input, builtins).parse();
    (program.to_string(), errors.iter().map(ToString::to_string).collect())
}

fn assert_ast(input: &str, want: &str) {
    let (got, errors) = parse(input);
    assert!(errors.is_empty(), "unexpected errors for {input:?}: {errors:?}");
    assert_eq!(got, want, "input: {input:?}");
}

fn assert_no_errors(input: &str) {
    let (_, errors) = parse(input);
    assert!(errors.is_empty(), "unexpected errors for {input:?}: {errors:?}");
}

fn first_error(input: &str) -> String {
    let (_, errors) = parse(input);
    assert!(!errors.is_empty(), "expected errors for {input:?}, got none");
    errors[0].clone()
}

#[test]
fn declarations() {
    let tests = [("a := 1", "a=1"),
                 ("a:bool", "a=false"),
                 ("\na:bool\n", "a=false"),
                 ("a:[]num", "a=[]"),
                 ("a:{}[]num", "a={}"),
                 ("a:{}[]any", "a={}"),
                 ("a := [true]", "a=[true]"),
                 ("a := []", "a=[]"),
                 ("a := [[1 2] ([3 4])]", "a=[[1, 2], [3, 4]]"),
                 ("a := {a:1 b:2}", "a={a:1, b:2}"),
                 ("a := {digits: [1 2 3] nums: [4 5]}", "a={digits:[1, 2, 3], nums:[4, 5]}"),
                 ("a := {digits: [] nums: [4]}", "a={digits:[], nums:[4]}"),
                 ("a := {digits: [4] nums: []}", "a={digits:[4], nums:[]}"),
                 ("a := [{}]", "a=[{}]"),
                 ("a := {a:1 b:true}", "a={a:1, b:true}"),
                 ("a := {a:1 b:true c:[1]}", "a={a:1, b:true, c:[1]}"),
                 ("a := [{a:1}]", "a=[{a:1}]")];
    for (input, want) in tests {
        let input = format!("{input}\n print a");
        let want = format!("{want}\nprint(a)\n");
        assert_ast(&input, &want);
    }
}

#[test]
fn declaration_sequence() {
    assert_ast("a := \"abc\"\nb:bool\nc := true\nprint a b c",
               "a='abc'\nb=false\nc=true\nprint(a, b, c)\n");
}

#[test]
fn empty_programs() {
    let tests = ["", "\n", "\n\n\n", " ", " \n //adf \n", "//blabla", "//blabla\n",
                 " \n //blabla \n", " \n //blabla"];
    for input in tests {
        assert_ast(input, "\n");
    }
}

#[test]
fn declaration_errors() {
    let tests = [("a :invalid", "line 1 column 1: invalid type declaration for 'a'"),
                 ("a :", "line 1 column 1: invalid type declaration for 'a'"),
                 ("a :\n", "line 1 column 1: invalid type declaration for 'a'"),
                 ("a ://blabla\n", "line 1 column 1: invalid type declaration for 'a'"),
                 ("a :true", "line 1 column 1: invalid type declaration for 'a'"),
                 ("a :[]", "line 1 column 1: invalid type declaration for 'a'"),
                 ("a :num[]", "line 1 column 7: expected end of line, found '['"),
                 ("a :()", "line 1 column 1: invalid type declaration for 'a'"),
                 ("a ::", "line 1 column 1: invalid type declaration for 'a'"),
                 ("a := {}{", "line 1 column 8: expected end of line, found '{'"),
                 ("a :=:", "line 1 column 5: unexpected ':'"),
                 ("a := {", "line 1 column 7: expected '}', got end of input"),
                 ("a := {}[", "line 1 column 9: unexpected end of input"),
                 ("a :num num", "line 1 column 8: expected end of line, found 'num'"),
                 ("a :num{}num", "line 1 column 7: expected end of line, found '{'"),
                 ("\nm := {name: \"Greta\"}\ns := name\nprint m[s]",
                  "line 3 column 6: unknown variable name 'name'")];
    for (input, want) in tests {
        assert_eq!(first_error(input), want, "input: {input:?}");
    }
}

#[test]
fn function_calls() {
    let tests = [("print", "print()\n"),
                 ("print 123", "print(123)\n"),
                 ("print 123 \"abc\"", "print(123, 'abc')\n"),
                 ("a:=1 \n print a", "a=1\nprint(a)\n"),
                 ("a := len \"abc\" \n print a", "a=len('abc')\nprint(a)\n"),
                 ("len \"abc\"", "len('abc')\n"),
                 ("len []", "len([])\n"),
                 ("a:string \n print a", "a=''\nprint(a)\n"),
                 ("a:=true\nb:string\nprint a b", "a=true\nb=''\nprint(a, b)\n")];
    for (input, want) in tests {
        assert_ast(input, want);
    }
}

fn test_builtins_with_fns() -> HashMap<String, Rc<FuncDecl>> {
    fn var(name: &str, typ: Type) -> Rc<RefCell<Var>> {
        Rc::new(RefCell::new(Var { name: name.to_string(),
                                   typ,
                                   pos: Pos { line: 0, column: 0 },
                                   is_used: true }))
    }
    fn decl(name: &str,
            params: Vec<Rc<RefCell<Var>>>,
            variadic_param: Option<Rc<RefCell<Var>>>)
            -> FuncDecl {
        FuncDecl { name: name.to_string(),
                   params,
                   variadic_param,
                   return_type: Type::None,
                   body: RefCell::new(Block::default()),
                   pos: Pos { line: 0, column: 0 } }
    }

    let mut builtins = builtin::declarations();
    builtins.insert("f0".to_string(), Rc::new(decl("f0", vec![], None)));
    builtins.insert("f1".to_string(),
                    Rc::new(decl("f1",
                                 vec![],
                                 Some(var("a", Type::Array(Box::new(Type::Num)))))));
    builtins.insert("f2".to_string(),
                    Rc::new(decl("f2", vec![var("a", Type::Num)], None)));
    builtins.insert("f3".to_string(),
                    Rc::new(decl("f3",
                                 vec![var("a", Type::Num), var("b", Type::String)],
                                 None)));
    builtins
}

#[test]
fn function_call_errors() {
    let tests = [("len 2 2", "line 1 column 8: 'len' takes 1 argument, found 2"),
                 ("len", "line 1 column 4: 'len' takes 1 argument, found 0"),
                 ("a := print",
                  "line 1 column 11: invalid declaration, function 'print' has no return value"),
                 ("a := f0",
                  "line 1 column 8: invalid declaration, function 'f0' has no return value"),
                 ("f0 \"arg\"", "line 1 column 9: 'f0' takes 0 arguments, found 1"),
                 ("f2", "line 1 column 3: 'f2' takes 1 argument, found 0"),
                 ("f2 f1", "line 1 column 4: function call must be parenthesized: (f1 ...)"),
                 ("f1 \"arg\"",
                  "line 1 column 9: 'f1' takes variadic arguments of type 'num', found 'string'"),
                 ("f3 1 2",
                  "line 1 column 7: 'f3' takes 2nd argument of type 'string', found 'num'"),
                 ("f3 \"1\" \"2\"",
                  "line 1 column 11: 'f3' takes 1st argument of type 'num', found 'string'"),
                 ("foo 0", "line 1 column 1: unknown function 'foo'")];
    for (input, want) in tests {
        let (_, errors) = parse_with(input, test_builtins_with_fns());
        assert!(!errors.is_empty(), "expected errors for {input:?}");
        assert_eq!(errors[0], want, "input: {input:?}");
    }
}

#[test]
fn blocks() {
    assert_ast("\nif true\n\tprint \"TRUE\"\nend",
               "if (true) {\nprint('TRUE')\n}\n");
    assert_ast("\nif true\n\tif true\n\t\tprint \"TRUE\"\n\tend\nend",
               "if (true) {\nif (true) {\nprint('TRUE')\n}\n}\n");
}

#[test]
fn toplevel_call_in_declaration() {
    assert_ast("\nx := len \"123\"\nprint x\n", "x=len('123')\nprint(x)\n");
}

#[test]
fn func_declarations() {
    let input = "
c := 1
func nums1:num n1:num n2:num
\tif c > 10
\t\tprint c
\t\treturn n1
\tend
\treturn n2
end
on mousedown
\tif c > 10
\t\tprint c
\tend
end
func nums2:num n1:num n2:num
\tif c > 10
\t\treturn n1
\telse
\t\treturn n2
\tend
end
func nums3
\tif true
\t\treturn
\tend
end
return \"success\"
func nums4:num
\ta := 5
\twhile true
\t\treturn 1
\tend
\tprint a \"reachable\"
\treturn 0
end
";
    let (program, errors) = Parser::new(input, builtin::declarations()).parse();
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
    assert_eq!(program.funcs.len(), builtin::declarations().len() + 4);

    let nums1 = &program.funcs["nums1"];
    assert_eq!(nums1.name, "nums1");
    assert_eq!(nums1.return_type, Type::Num);
    assert!(nums1.variadic_param.is_none());
    assert_eq!(nums1.params.len(), 2);
    assert_eq!(nums1.params[0].borrow().name, "n1");
    assert_eq!(nums1.params[0].borrow().typ, Type::Num);
    let body = nums1.body.borrow();
    assert_eq!(body.statements.len(), 2);
    assert_eq!(body.statements[1].to_string(), "return n2");
}

#[test]
fn return_errors() {
    let tests = [("\nfunc add:num\n\treturn 1\n\tprint \"boom\"\nend\n",
                  "line 4 column 2: unreachable code"),
                 ("\nfunc nums:num\n\tif true\n\t\treturn 1\n\telse\n\t\treturn 2\n\tend\n\tprint \"boom\"\nend\n",
                  "line 8 column 2: unreachable code"),
                 ("\nwhile true\n\tif true\n\t\treturn 1\n\telse\n\t\treturn 2\n\tend\n\tprint \"deadcode\"\nend\n",
                  "line 8 column 2: unreachable code"),
                 ("\nfoo\nreturn false\nfunc foo\n\tprint \"hello\"\nend\nprint \"do i run?\"\n",
                  "line 7 column 1: unreachable code"),
                 ("\nfunc nums:num\n\twhile true\n\t\tif true\n\t\t\treturn 1\n\t\tend\n\tend\nend\n",
                  "line 8 column 1: missing return"),
                 ("\nfunc nums:num\n\tif true\n\t\treturn 1\n\tend\nend\n",
                  "line 6 column 1: missing return")];
    for (input, want) in tests {
        assert_eq!(first_error(input), want, "input: {input:?}");
    }
}

#[test]
fn assignments() {
    let tests = ["\na := 1\nb:num\nb = a\nprint b\n",
                 "\na:num\nb:num\nb = a\nprint b\n",
                 "\na:num\nb:any\nb = a\nprint b\n",
                 "\na := [0 2 3]\na[0] = 1\nprint a\n",
                 "\na :=  [ [0 2 3] ([4 5]) ]\na[0][1] = 1\nprint a\n",
                 "\na := {name: \"mali\"}\na.sport = \"climbing\"\nprint a\n"];
    for input in tests {
        assert_no_errors(input);
    }
}

#[test]
fn assignment_errors() {
    let tests = [("\nb:num\nb = true\n",
                  "line 3 column 1: 'b' accepts values of type num, found bool"),
                 ("\na:= 1\na = b\n", "line 3 column 5: unknown variable name 'b'"),
                 ("\na:= 1\nb = a\n", "line 3 column 1: unknown variable name 'b'"),
                 ("\na:= 1\na = []\n",
                  "line 3 column 1: 'a' accepts values of type num, found []"),
                 ("\na:num\nb:any\na = b\n",
                  "line 4 column 1: 'a' accepts values of type num, found any"),
                 ("\nfunc fn:bool\n\treturn true\nend\nfn = 3\n",
                  "line 5 column 1: cannot assign to 'fn' as it is a function not a variable")];
    for (input, want) in tests {
        assert_eq!(first_error(input), want, "input: {input:?}");
    }
}

#[test]
fn scopes() {
    let tests = ["\nx := 1\nfunc foo\n\tx := \"abc\"\n\tprint x\nend\nprint x\n",
                 "\nx := 1\nfunc foo x:string\n\tx = \"abc\"\n\tprint x\nend\nprint x\n",
                 "\nx := 1\nfunc foo\n\tx = 2\n\tprint x\nend\n",
                 "\nx := 1\nfunc foo x:string...\n\tprint x\nend\nprint x\n",
                 "\nx := 1\nif true\n\tx := \"abc\" // block scope\n\tprint x\nend\nprint x\n",
                 "\na := [ ([1 2 3]) ([4 5 6]) ]\nb := a[0]\nb[1] = 7\nprint a\n"];
    for input in tests {
        assert_no_errors(input);
    }
}

#[test]
fn unused_variable_errors() {
    let tests = [("\nx := 1\n", "line 2 column 1: 'x' declared but not used"),
                 ("\nx := 1\nif true\n\tx := 1\nend\nprint x\n",
                  "line 4 column 2: 'x' declared but not used"),
                 ("\nx := 1\nif true\n\tx := 1\n\tprint x\nend\n",
                  "line 2 column 1: 'x' declared but not used"),
                 ("\nx := 1\nif true\n\tprint \"foo\"\nelse\n\tx := 1\n\tprint x\nend\n",
                  "line 2 column 1: 'x' declared but not used"),
                 ("\nx := 1\nif true\n\tprint \"foo\"\nelse\n\tx := 1\nend\nprint x\n",
                  "line 6 column 2: 'x' declared but not used"),
                 ("\nx := 1\nif true\n\tprint \"foo\"\nelse if true\n\tx := 1\nend\nprint x\n",
                  "line 6 column 2: 'x' declared but not used"),
                 ("\nx := 1\nfor i := range 10\n\tx := 2\n\tprint i x\nend\n",
                  "line 2 column 1: 'x' declared but not used"),
                 ("\nx := 1\nfor i := range 10\n\tx := 2 * i\nend\nprint x\n",
                  "line 4 column 2: 'x' declared but not used"),
                 ("\nx := 1\nwhile true\n\tx := 2\n\tprint x\nend\n",
                  "line 2 column 1: 'x' declared but not used"),
                 ("\nx := 1\nwhile true\n\tx := 2\nend\nprint x\n",
                  "line 4 column 2: 'x' declared but not used"),
                 ("\nx := 1\nfunc foo\n\tx := 2\nend\nprint x\n",
                  "line 4 column 2: 'x' declared but not used"),
                 ("\nx := 1\nfunc foo\n\tx := 2\n\tprint x\nend\n",
                  "line 2 column 1: 'x' declared but not used")];
    for (input, want) in tests {
        assert_eq!(first_error(input), want, "input: {input:?}");
    }
}

#[test]
fn scope_errors() {
    let tests = [("\nx := 1\nx := 2\n", "line 3 column 1: redeclaration of 'x'"),
                 ("\nx := 1\nx := \"abc\"\n", "line 3 column 1: redeclaration of 'x'"),
                 ("\nx :num\nx := \"abc\"\n", "line 3 column 1: redeclaration of 'x'"),
                 ("\nx := \"abc\"\nx :num\n", "line 3 column 1: redeclaration of 'x'"),
                 ("\nx :num\nx :num\n", "line 3 column 1: redeclaration of 'x'"),
                 ("\nx :num\nx :string\n", "line 3 column 1: redeclaration of 'x'"),
                 ("\nx :num\nfunc x\n\tprint \"abc\"\nend\n",
                  "line 2 column 1: invalid declaration of 'x', already used as function name"),
                 ("\nfunc x in:num\n\tin:string\nend\n",
                  "line 3 column 2: redeclaration of 'in'"),
                 ("\nfunc foo\n\tx := 0\n\tx := 0\nend\n",
                  "line 4 column 2: redeclaration of 'x'"),
                 ("\nfunc x\n\tx := 0\nend\n",
                  "line 3 column 2: invalid declaration of 'x', already used as function name"),
                 ("\nfunc x in:string in:string\n\tprint in\nend\n",
                  "line 2 column 18: redeclaration of parameter 'in'"),
                 ("\nfunc x x:string\n\tprint x\nend\n",
                  "line 2 column 8: invalid declaration of parameter 'x', already used as function name"),
                 ("\nfunc x x:string...\n\tprint x\nend\n",
                  "line 2 column 8: invalid declaration of parameter 'x', already used as function name")];
    for (input, want) in tests {
        assert_eq!(first_error(input), want, "input: {input:?}");
    }
}

#[test]
fn if_statements() {
    let tests = ["if true\n\tprint \"yeah\"\nend",
                 "if true\n\tprint \"true\"\nelse\n\tprint \"false\"\nend",
                 "if true\n\tprint \"true\"\nelse if false\n\tprint \"false\"\nend",
                 "if true\n\tprint \"true\"\nelse if false\n\tprint \"false\"\nelse if true\n\tprint \"true true\"\nelse\n\tprint \"false\"\nend",
                 "if true\n\tif true\n\t\tprint \"true true\"\n\telse\n\t\tprint \"true false\"\n\tend\nelse\n\tif true\n\t\tprint \"false true\"\n\telse\n\t\tprint \"false false\"\n\tend\nend"];
    for input in tests {
        assert_no_errors(input);
    }
}

#[test]
fn if_errors() {
    let tests = [("\nif true\n\tprint \"baba yaga\"\n",
                  "line 4 column 1: expected 'end', got end of input"),
                 ("\nif true\nend", "line 3 column 1: at least one statement is required here"),
                 ("\nif\n\tprint \"baba yaga\"\nend", "line 2 column 3: unexpected end of line"),
                 ("\nif true\n\tprint \"true\"\nelse true\n\tprint \"true\"\nend",
                  "line 4 column 6: expected end of line, found 'true'"),
                 ("\nif true\n\tprint \"true\"\nelse if\n\tprint \"true\"\nend",
                  "line 4 column 8: unexpected end of line"),
                 ("\nif true\n\tprint \"true\"\nelse\n\tprint \"false\"\nelse if false\n\tprint \"true\"\nend",
                  "line 6 column 1: unexpected input 'else'"),
                 ("\nif true\n\tif true\n\t\tprint \"true true\"\nelse\n\tprint \"false\"\nend",
                  "line 7 column 4: expected 'end', got end of input")];
    for (input, want) in tests {
        assert_eq!(first_error(input), want, "input: {input:?}");
    }
}

#[test]
fn while_statements() {
    assert_no_errors("\nwhile true\n\tprint \"forever\"\nend");
    assert_no_errors("\nwhile has_more\n\tprint \"some\"\nend\n\ntwo_more := true\none_more := true\nfunc has_more:bool\n\tif one_more\n\t\tif two_more\n\t\t\ttwo_more = false\n\t\t\treturn false\n\t\telse\n\t\t\tone_more = false\n\t\t\treturn false\n\t\tend\n\tend\n\treturn true\nend\n");
}

#[test]
fn while_errors() {
    let tests = [("\nwhile true\n\tprint \"forever\"\n",
                  "line 4 column 1: expected 'end', got end of input"),
                 ("\nwhile true\nend",
                  "line 3 column 1: at least one statement is required here"),
                 ("\nwhile\n\tprint \"forever\"\nend",
                  "line 2 column 6: unexpected end of line")];
    for (input, want) in tests {
        assert_eq!(first_error(input), want, "input: {input:?}");
    }
}

#[test]
fn break_statements() {
    let tests = ["\nwhile true\n\tbreak\nend",
                 "\nwhile true\n\tif false\n\t\tbreak\n\tend\nend",
                 "\nwhile true\n\tprint \"once\"\n\tif true\n\t\tbreak\n\tend\n\tprint \"more\"\nend",
                 "\nfunc foo\n\twhile true\n\t\tbreak\n\tend\nend\nfoo"];
    for input in tests {
        assert_no_errors(input);
    }
}

#[test]
fn break_errors() {
    let tests = [("\nwhile true\n\tbreak 123\nend\n",
                  "line 3 column 8: expected end of line, found 123"),
                 ("\nbreak\n", "line 2 column 1: break is not in a loop"),
                 ("\nif true\n\tbreak\nend\n", "line 3 column 2: break is not in a loop"),
                 ("\nfunc x\n\tbreak\nend\n", "line 3 column 2: break is not in a loop"),
                 ("\nfunc x\n\tif true\n\t\tprint \"foo\"\n\telse\n\t\tbreak\n\tend\nend\n",
                  "line 6 column 3: break is not in a loop"),
                 ("\nwhile true\n\tbreak\n\tprint \"deadcode\"\nend\n",
                  "line 4 column 2: unreachable code"),
                 ("\nwhile true\n\tif true\n\t\tbreak\n\telse\n\t\tbreak\n\tend\n\tprint \"deadcode\"\nend\n",
                  "line 8 column 2: unreachable code"),
                 ("\nfunc a\n\twhile true\n\t\tif true\n\t\t\tbreak\n\t\telse\n\t\t\treturn\n\t\tend\n\t\tprint \"deadcode\"\n\tend\nend\n",
                  "line 9 column 3: unreachable code"),
                 ("\nfunc a:num\n\twhile true\n\t\tif true\n\t\t\treturn 0\n\t\telse\n\t\t\tbreak\n\t\tend\n\t\tprint \"deadcode\"\n\tend\nend\n",
                  "line 9 column 3: unreachable code")];
    for (input, want) in tests {
        assert_eq!(first_error(input), want, "input: {input:?}");
    }
}

#[test]
fn for_statements() {
    let tests = ["\nfor i:= range 3\n\tprint i\nend",
                 "\nfor i:= range 3 5\n\tprint i\nend",
                 "\nfor i:= range 3 15 -1\n\tprint i\nend",
                 "\nfor i:= range \"abc\"\n\tprint i\nend",
                 "\nfor i:= range {}\n\tprint i\nend",
                 "\nfor i:= range []\n\tprint i\nend",
                 "\nfor i:= range []\n\tprint i\n\tbreak\nend"];
    for input in tests {
        assert_no_errors(input);
    }
}

#[test]
fn for_errors() {
    let tests = [("\nfor\n\tprint \"X\"\nend\n",
                  "line 2 column 4: expected variable, found end of line"),
                 ("\nfor true\n\tprint \"X\"\nend\n",
                  "line 2 column 5: expected variable, found 'true'"),
                 ("\nx := 0\nfor x = range 5\n\tprint \"X\"\nend\n",
                  "line 3 column 7: expected ':=', got '='"),
                 ("\nfor x := range 1 2 3 4\n\tprint \"X\"\nend\n",
                  "line 2 column 10: range can take up to 3 num arguments, found 4"),
                 ("\nfor x := range true\n\tprint \"X\"\nend\n",
                  "line 2 column 20: expected num, string, array or map after range, found bool"),
                 ("\nfor x := range 1 true\n\tprint \"X\"\nend\n",
                  "line 2 column 10: range expects num type for 2nd argument, found bool")];
    for (input, want) in tests {
        assert_eq!(first_error(input), want, "input: {input:?}");
    }
}

#[test]
fn demo_program_recovers_from_unknown_functions() {
    // Only `print` and `len` in the table, so the graphics calls are unknown.
    let mut builtins = builtin::declarations();
    builtins.retain(|name, _| name == "print" || name == "len");

    let input = "\nmove 10 10\nline 20 20\n\nx := 12\nprint \"x:\" x\nif x > 10\n\tprint \"big x\"\nend";
    let (program, errors) = Parser::new(input, builtins).parse();
    assert!(errors.len() >= 2, "errors: {errors:?}");
    assert_eq!(errors[0].to_string(), "line 2 column 1: unknown function 'move'");
    assert_eq!(errors[1].to_string(), "line 3 column 1: unknown function 'line'");
    assert_eq!(program.to_string(),
               "x=12\nprint('x:', x)\nif ((x>10)) {\nprint('big x')\n}\n");
}

#[test]
fn whitespace_rules() {
    // In an argument list, whitespace separates: `a [0]` is two arguments.
    assert_ast("a := [1 2]\nprint a [0]\n", "a=[1, 2]\nprint(a, [0])\n");
    assert_no_errors("a := [1 2]\nprint a[0]\n");
    assert_eq!(first_error("a := [1 2]\nx := a [0]\nprint x\n"),
               "line 2 column 8: unexpected whitespace before '['");
    assert_eq!(first_error("x := - 1\nprint x\n"),
               "line 1 column 6: unexpected whitespace after '-'");
    assert_eq!(first_error("m := {a:1}\nprint m . a\n"),
               "line 2 column 9: unexpected '.'");
}

#[test]
fn condition_type_errors() {
    assert_eq!(first_error("if 1\n\tprint \"x\"\nend"),
               "line 1 column 4: expected bool condition, found num");
    assert_eq!(first_error("while \"s\"\n\tprint \"x\"\nend"),
               "line 1 column 7: expected bool condition, found string");
}

#[test]
fn operator_type_errors() {
    assert_eq!(first_error("a := 1 + \"x\"\nprint a"),
               "line 1 column 8: mismatched type for +: num, string");
    assert_eq!(first_error("a := true + false\nprint a"),
               "line 1 column 11: '+' takes num, string or array type, found bool");
    assert_eq!(first_error("a := \"x\" * \"y\"\nprint a"),
               "line 1 column 10: '*' takes num type, found string");
    assert_eq!(first_error("a := 1 and 2\nprint a"),
               "line 1 column 8: 'and' takes bool type, found num");
    assert_eq!(first_error("a := -true\nprint a"),
               "line 1 column 6: '-' unary expects num type, found bool");
    assert_eq!(first_error("a := !1\nprint a"),
               "line 1 column 6: '!' unary expects bool type, found num");
}

#[test]
fn index_type_errors() {
    assert_eq!(first_error("a := [1 2]\nprint a[\"x\"]\n"),
               "line 2 column 8: array index expects num, found string");
    assert_eq!(first_error("m := {a:1}\nprint m[1]\n"),
               "line 2 column 8: map index expects string, found num");
    assert_eq!(first_error("n := 1\nprint n[0]\n"),
               "line 2 column 8: only array, string and map type can be indexed, found num");
    assert_eq!(first_error("m := {a:1}\nprint m[1:2]\n"),
               "line 2 column 8: only array and string type can be sliced, found num{}");
    assert_eq!(first_error("m := {a:1}\nprint m.a.b\n"),
               "line 2 column 10: field access with '.' expects map type, found num");
}

#[test]
fn map_literal_errors() {
    assert_eq!(first_error("a := {a:1 a:2}\nprint a"),
               "line 1 column 11: duplicated map key 'a'");
    assert_eq!(first_error("a := {1:2}\nprint a"),
               "line 1 column 7: expected map key, found 1");
}

#[test]
fn string_targets_are_not_assignable() {
    assert_eq!(first_error("s := \"abc\"\ns[0] = \"x\"\nprint s\n"),
               "line 2 column 1: cannot assign to string index");
    assert_eq!(first_error("s := \"abc\"\ns[0:1] = \"x\"\nprint s\n"),
               "line 2 column 1: cannot assign to string slice");
}

#[test]
fn reprinting_is_deterministic() {
    let input = "a := {x:1 y:[1 2]}\nif true\n\tprint a\nend";
    let (first, errors) = parse(input);
    assert!(errors.is_empty());
    let (second, _) = parse(input);
    assert_eq!(first, second);
}
