use super::*;
use chtl_parser::parse_str;

fn render(source: &str) -> String {
    let program = parse_str(source);
    assert!(program.diagnostics.is_empty(), "{:?}", program.diagnostics);
    Generator::new(&program).generate().unwrap()
}

fn render_err(source: &str) -> CompileError {
    let program = parse_str(source);
    assert!(program.diagnostics.is_empty(), "{:?}", program.diagnostics);
    Generator::new(&program).generate().unwrap_err()
}

#[test]
fn test_inline_arithmetic() {
    assert_eq!(
        render("div { style { width: 100px + 50px; } }"),
        r#"<div style="width:150px;"></div>"#
    );
}

#[test]
fn test_class_rule_goes_to_head() {
    assert_eq!(
        render("div { style { .box { color: red; } } }"),
        r#"<head><style>.box{color:red;}</style></head><div class="box"></div>"#
    );
}

#[test]
fn test_custom_delete() {
    let html = render(
        "[Custom] @Style Btn { color: blue; padding: 10px; }\n\
         div { @Style Btn { delete padding; } }",
    );
    assert_eq!(html, r#"<div style="color:blue;"></div>"#);
}

#[test]
fn test_inline_order_is_first_write() {
    let html = render(
        "[Template] @Style Base { color: red; margin: 0; }\n\
         div { style { margin: 4px; @Style Base; color: blue; } }",
    );
    assert_eq!(html, r#"<div style="margin:0;color:blue;"></div>"#);
}

#[test]
fn test_later_properties_see_earlier_ones() {
    assert_eq!(
        render("div { style { width: 10px; height: width * 2; } }"),
        r#"<div style="width:10px;height:20px;"></div>"#
    );
}

#[test]
fn test_attributes_then_injected_class_and_id() {
    let html = render(
        "div { title: \"t\"; class = a; style { .b { } #main { } } text { \"hi\" } }",
    );
    assert_eq!(
        html,
        r#"<head><style>.b{}#main{}</style></head><div title="t" class="a b" id="main">hi</div>"#
    );
}

#[test]
fn test_duplicate_attribute_last_wins_in_first_position() {
    assert_eq!(
        render("a { href: one; id: x; href: two; }"),
        r#"<a href="two" id="x"></a>"#
    );
}

#[test]
fn test_parent_selector() {
    let html = render("div { style { .card { color: red; } &:hover { color: blue; } } }");
    assert_eq!(
        html,
        r#"<head><style>.card{color:red;}.card:hover{color:blue;}</style></head><div class="card"></div>"#
    );
}

#[test]
fn test_parent_selector_without_main_uses_tag() {
    let html = render("button { style { &:hover { color: blue; } } }");
    assert_eq!(
        html,
        r#"<head><style>button:hover{color:blue;}</style></head><button></button>"#
    );
}

#[test]
fn test_namespace_first_lookup() {
    let html = render(
        "[Template] @Style S { color: red; }\n\
         [Namespace] N { [Template] @Style S { color: blue; } div { style { @Style S; } } }\n\
         p { style { @Style S; } }",
    );
    assert_eq!(
        html,
        r#"<div style="color:blue;"></div><p style="color:red;"></p>"#
    );
}

#[test]
fn test_explicit_namespace_on_usage() {
    let html = render(
        "[Namespace] ui { [Template] @Style S { color: blue; } }\n\
         p { style { @Style S from ui; } }",
    );
    assert_eq!(html, r#"<p style="color:blue;"></p>"#);
}

#[test]
fn test_inheritance_before_own_properties() {
    let html = render(
        "[Template] @Style Base { color: red; size: 1px; }\n\
         [Template] @Style Big { size: 2px; inherit @Style Base; }\n\
         div { style { @Style Big; } }",
    );
    assert_eq!(html, r#"<div style="color:red;size:2px;"></div>"#);
}

#[test]
fn test_valueless_custom_properties() {
    let html = render(
        "[Custom] @Style Box { color, width; height: 1px; }\n\
         div { style { @Style Box { color: red; } } }",
    );
    assert_eq!(html, r#"<div style="color:red;height:1px;"></div>"#);
}

#[test]
fn test_semicolon_usage_of_custom_applies_it_whole() {
    let html = render(
        "[Custom] @Style Btn { color: blue; padding: 10px; }\n\
         div { style { @Style Btn; } }",
    );
    assert_eq!(html, r#"<div style="color:blue;padding:10px;"></div>"#);
}

#[test]
fn test_variable_access() {
    let html = render(
        "[Template] @Var Theme { primary: blue; gap: 4px; }\n\
         div { style { color: Theme(primary); margin: Theme(gap) * 2; } }",
    );
    assert_eq!(html, r#"<div style="color:blue;margin:8px;"></div>"#);
}

#[test]
fn test_element_template_is_spliced() {
    let html = render(
        "[Template] @Element Card { div { text { \"a\" } } p { } }\n\
         body { @Element Card; }",
    );
    assert_eq!(html, "<body><div>a</div><p></p></body>");
}

#[test]
fn test_spliced_body_resolves_in_usage_namespace() {
    let html = render(
        "[Template] @Style Tone { color: red; }\n\
         [Template] @Element Card { div { style { @Style Tone; } } }\n\
         [Namespace] dark { [Template] @Style Tone { color: black; } @Element Card; }",
    );
    assert_eq!(html, r#"<div style="color:black;"></div>"#);
}

#[test]
fn test_custom_element_delete_and_insert() {
    let html = render(
        "[Custom] @Element Box { div {} span {} div {} }\n\
         section { @Element Box { delete span; insert after div[1] { p {} } insert at top { hr {} } } }",
    );
    assert_eq!(html, "<section><hr><div></div><div></div><p></p></section>");
}

#[test]
fn test_index_initial_count() {
    let html = render(
        "[Configuration] { INDEX_INITIAL_COUNT = 1; }\n\
         [Custom] @Element Box { div { text { a } } div { text { b } } }\n\
         @Element Box { delete div[1]; }",
    );
    assert_eq!(html, "<div>b</div>");
}

#[test]
fn test_replace_insert() {
    let html = render(
        "[Custom] @Element Box { div {} span {} }\n\
         @Element Box { insert replace span { em {} } }",
    );
    assert_eq!(html, "<div></div><em></em>");
}

#[test]
fn test_comments_scripts_and_origins() {
    let html = render(
        "# hello\n\
         div { script { let a = 1; } }\n\
         [Origin] @Html { <b>raw</b> }\n\
         [Origin] @Style { .x{color:red;} }\n\
         [Origin] @JavaScript { run(); }",
    );
    assert_eq!(
        html,
        "<head><style>.x{color:red;}</style></head><!-- hello --><div><script>let a = 1;</script></div><b>raw</b><script>run();</script>"
    );
}

#[test]
fn test_script_processor_is_called() {
    let program = parse_str("script { a }");
    let upper = |s: &str| format!("/*processed*/{}", s);
    let html = Generator::new(&program).with_script(&upper).generate().unwrap();
    assert_eq!(html, "<script>/*processed*/a</script>");
}

#[test]
fn test_doctype_and_void_elements() {
    assert_eq!(
        render("use html5; div { br {} img { src: \"a.png\"; } }"),
        r#"<!DOCTYPE html><div><br><img src="a.png"></div>"#
    );
}

#[test]
fn test_text_is_escaped() {
    assert_eq!(
        render("p { title: 'say \"hi\"'; text { \"x < y & z\" } }"),
        r#"<p title="say &quot;hi&quot;">x &lt; y &amp; z</p>"#
    );
}

#[test]
fn test_unit_mismatch_aborts() {
    let err = render_err("div { style { width: 1px + 1em; } }");
    assert_eq!(err.kind, ErrorKind::UnitMismatch);
    assert_eq!(err.message, "cannot add 'px' and 'em'");
    assert_eq!(err.to_string(), "error: unit mismatch: cannot add 'px' and 'em'");
}

#[test]
fn test_division_by_zero_in_rule_aborts() {
    let err = render_err("div { style { .a { width: 10px / 0; } } }");
    assert_eq!(err.kind, ErrorKind::DivisionByZero);
}

#[test]
fn test_undefined_usage() {
    let err = render_err("div { style { @Style Nope; } }");
    assert_eq!(err.kind, ErrorKind::UndefinedTemplate);
    assert_eq!(err.message, "undefined template '@Style Nope'");
}

#[test]
fn test_custom_form_needs_a_custom() {
    let err = render_err("[Template] @Style T { a: 1; } div { @Style T { delete a; } }");
    assert_eq!(err.kind, ErrorKind::UndefinedTemplate);
    assert_eq!(err.message, "undefined custom '@Style T'");
}

#[test]
fn test_usage_of_wrong_kind() {
    let err = render_err("[Template] @Element E { div {} } div { style { @Style E; } }");
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
    assert_eq!(err.message, "'@Style E' names a @Element definition");
    assert_eq!(err.labels.len(), 1);
}

#[test]
fn test_depth_limit() {
    let program = parse_str("div { div { div { div {} } } }");
    let err = Generator::new(&program).with_max_depth(3).generate().unwrap_err();
    assert_eq!(err.kind, ErrorKind::DepthLimit);
}

#[test]
fn test_recursive_element_template_hits_depth_limit() {
    let err = render_err("[Template] @Element Loop { div { @Element Loop; } } @Element Loop;");
    assert_eq!(err.kind, ErrorKind::DepthLimit);
}

#[test]
fn test_cyclic_style_inheritance_hits_depth_limit() {
    let err = render_err(
        "[Template] @Style A { @Style B; } [Template] @Style B { @Style A; } div { style { @Style A; } }",
    );
    assert_eq!(err.kind, ErrorKind::DepthLimit);
}

fn if_chain(width: &str) -> String {
    format!(
        "div {{ style {{ width: {}; }}\n\
           if {{ condition: width > 100px; color: red; span {{ text {{ \"wide\" }} }} }}\n\
           else if {{ condition: width > 50px; color: orange; }}\n\
           else {{ color: green; text: \"narrow\"; }}\n\
         }}",
        width
    )
}

#[test]
fn test_if_branch_taken() {
    assert_eq!(
        render(&if_chain("200px")),
        r#"<div style="width:200px;color:red;"><span>wide</span></div>"#
    );
}

#[test]
fn test_else_if_branch_taken() {
    assert_eq!(
        render(&if_chain("80px")),
        r#"<div style="width:80px;color:orange;"></div>"#
    );
}

#[test]
fn test_else_branch_taken() {
    assert_eq!(
        render(&if_chain("10px")),
        r#"<div style="width:10px;color:green;">narrow</div>"#
    );
}

#[test]
fn test_if_without_else_and_no_match() {
    assert_eq!(
        render("p { if { condition: 1 > 2; color: red; } }"),
        "<p></p>"
    );
}

#[test]
fn test_if_condition_must_be_boolean() {
    let err = render_err("p { if { condition: 1px + 1px; color: red; } }");
    assert_eq!(err.kind, ErrorKind::NonBooleanCondition);
    assert_eq!(err.message, "condition must be a boolean, got number");
}

#[test]
fn test_if_at_top_level_renders_content() {
    assert_eq!(
        render("if { condition: 2 > 1; color: red; p { } } else { span { } }"),
        "<p></p>"
    );
}
