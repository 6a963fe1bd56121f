use corvus_css3::sink::{AtRule, CollectingSink, SinkEvent};
use corvus_css3::Css3Parser;

fn parse(css: &str) -> CollectingSink {
    let mut sink = CollectingSink::new();
    Css3Parser::default().parse_stylesheet(css, &mut sink).unwrap();
    sink
}

#[test]
fn style_rule_event_stream() {
    let sink = parse("div, p { color: red; margin: 0 auto }");

    let SinkEvent::StartRule(selectors) = &sink.events[0] else {
        panic!("expected a rule start, got {:?}", sink.events[0]);
    };
    assert_eq!(selectors.css_text(), "div, p");
    assert_eq!(
        sink.events[1],
        SinkEvent::Declaration {
            name: "color".to_string(),
            value: "red".to_string(),
            important: false,
        }
    );
    assert_eq!(
        sink.events[2],
        SinkEvent::Declaration {
            name: "margin".to_string(),
            value: "0 auto".to_string(),
            important: false,
        }
    );
    assert_eq!(sink.events[3], SinkEvent::EndRule);
    assert_eq!(sink.events.len(), 4);
}

#[test]
fn important_flag() {
    let sink = parse("a { color: blue !important; }");
    assert_eq!(
        sink.events[1],
        SinkEvent::Declaration {
            name: "color".to_string(),
            value: "blue".to_string(),
            important: true,
        }
    );
}

#[test]
fn media_rule_wraps_its_rules() {
    let sink = parse("@media screen and (min-width: 600px) { div { color: red } }");

    let SinkEvent::StartAtRule(AtRule::Media(queries)) = &sink.events[0] else {
        panic!("expected @media, got {:?}", sink.events[0]);
    };
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].css_text(), "screen and (min-width: 600px)");
    assert!(matches!(sink.events[1], SinkEvent::StartRule(_)));
    assert!(matches!(sink.events[3], SinkEvent::EndRule));
    assert!(matches!(sink.events[4], SinkEvent::EndAtRule(AtRule::Media(_))));
}

#[test]
fn supports_rule() {
    let sink = parse("@supports (display: grid) { main { display: grid } }");
    let SinkEvent::StartAtRule(AtRule::Supports(condition)) = &sink.events[0] else {
        panic!("expected @supports, got {:?}", sink.events[0]);
    };
    assert_eq!(condition.css_text(), "(display: grid)");
}

#[test]
fn font_face_is_a_declaration_block() {
    let sink = parse("@font-face { font-family: 'Indie Flower'; src: url(flower.woff2) }");
    assert!(matches!(sink.events[0], SinkEvent::StartAtRule(AtRule::FontFace)));
    assert_eq!(
        sink.events[1],
        SinkEvent::Declaration {
            name: "font-family".to_string(),
            value: "'Indie Flower'".to_string(),
            important: false,
        }
    );
    assert!(matches!(sink.events.last(), Some(SinkEvent::EndAtRule(AtRule::FontFace))));
}

#[test]
fn keyframes_produce_keyframe_blocks() {
    let sink = parse(
        "@keyframes spin { from { transform: rotate(0deg) } 50% { transform: rotate(180deg) } }",
    );

    assert!(matches!(
        &sink.events[0],
        SinkEvent::StartAtRule(AtRule::Keyframes(name)) if name == "spin"
    ));
    assert!(matches!(
        &sink.events[1],
        SinkEvent::StartAtRule(AtRule::Keyframe(sel)) if sel == "from"
    ));
    assert!(matches!(
        &sink.events[4],
        SinkEvent::StartAtRule(AtRule::Keyframe(sel)) if sel == "50%"
    ));
    assert!(matches!(
        sink.events.last(),
        Some(SinkEvent::EndAtRule(AtRule::Keyframes(_)))
    ));
}

#[test]
fn property_rule_reports_its_syntax_descriptor() {
    let sink = parse("@property --hue { syntax: '<angle>'; inherits: false; initial-value: 0deg }");

    assert!(matches!(
        &sink.events[0],
        SinkEvent::StartAtRule(AtRule::Property(name)) if name == "--hue"
    ));
    assert!(sink.events.iter().any(|e| matches!(
        e,
        SinkEvent::SyntaxDescriptor { property, syntax }
            if property == "--hue" && syntax == "<angle>"
    )));
}

#[test]
fn namespace_prefixes_bind_and_unknown_ones_fail() {
    let css = "@namespace svg url(http://www.w3.org/2000/svg);\n\
               svg|circle { fill: red }\n\
               foo|rect { fill: blue }\n\
               p { color: green }";
    let sink = parse(css);

    assert!(matches!(
        &sink.events[0],
        SinkEvent::StartAtRule(AtRule::Namespace { prefix: Some(p), uri })
            if p == "svg" && uri == "http://www.w3.org/2000/svg"
    ));
    // svg|circle parses, foo|rect is reported and dropped, p survives
    let rules: Vec<_> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            SinkEvent::StartRule(list) => Some(list.css_text()),
            _ => None,
        })
        .collect();
    assert_eq!(rules, ["svg|circle", "p"]);
    assert_eq!(sink.errors().count(), 1);
}

#[test]
fn import_with_media() {
    let sink = parse("@import url('theme.css') screen;");
    assert!(matches!(
        &sink.events[0],
        SinkEvent::StartAtRule(AtRule::Import { href, media })
            if href == "theme.css" && media.len() == 1
    ));
}

#[test]
fn page_rule_with_margin_box() {
    let sink = parse("@page :first { margin: 1in; @top-center { content: 'Draft' } }");

    assert!(matches!(
        &sink.events[0],
        SinkEvent::StartAtRule(AtRule::Page(Some(sel))) if sel == ":first"
    ));
    assert!(sink.events.iter().any(|e| matches!(
        e,
        SinkEvent::StartAtRule(AtRule::MarginBox(name)) if name == "top-center"
    )));
}

#[test]
fn nested_rules_substitute_inside_parents() {
    let sink = parse("div { color: red; &.active { color: blue } }");

    let rules: Vec<_> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            SinkEvent::StartRule(list) => Some(list.css_text()),
            _ => None,
        })
        .collect();
    assert_eq!(rules, ["div", "&.active"]);
    assert_eq!(
        sink.events
            .iter()
            .filter(|e| matches!(e, SinkEvent::EndRule))
            .count(),
        2
    );
}

#[test]
fn nested_type_selector_rule() {
    let sink = parse("nav { ul li { margin: 0 } }");
    let rules: Vec<_> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            SinkEvent::StartRule(list) => Some(list.css_text()),
            _ => None,
        })
        .collect();
    assert_eq!(rules, ["nav", "ul li"]);
}

#[test]
fn bad_declaration_recovers_at_the_semicolon() {
    let sink = parse("div { color:; background: blue }");

    assert_eq!(sink.errors().count(), 1);
    assert!(sink.events.iter().any(|e| matches!(
        e,
        SinkEvent::Declaration { name, .. } if name == "background"
    )));
    assert!(matches!(sink.events.last(), Some(SinkEvent::EndRule)));
}

#[test]
fn bad_rule_recovers_at_the_closing_brace() {
    let sink = parse("div { color: $$; } p { color: blue }");

    assert!(sink.errors().count() >= 1);
    let rules: Vec<_> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            SinkEvent::StartRule(list) => Some(list.css_text()),
            _ => None,
        })
        .collect();
    assert_eq!(rules, ["div", "p"]);
}

#[test]
fn empty_value_keeps_the_block_structure() {
    let sink = parse("div { color: } p { color: blue }");

    assert_eq!(sink.errors().count(), 1);
    let rules: Vec<_> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            SinkEvent::StartRule(list) => Some(list.css_text()),
            _ => None,
        })
        .collect();
    assert_eq!(rules, ["div", "p"]);
    assert!(matches!(sink.events.last(), Some(SinkEvent::EndRule)));
}

#[test]
fn control_characters_are_reported_and_skipped() {
    let sink = parse("div { color: \u{0007} red; } p { color: blue }");

    assert_eq!(sink.errors().count(), 1);
    let rules: Vec<_> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            SinkEvent::StartRule(list) => Some(list.css_text()),
            _ => None,
        })
        .collect();
    assert_eq!(rules, ["div", "p"]);
    // the declaration carrying the bad byte is dropped; only p's survives
    let decls: Vec<_> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            SinkEvent::Declaration { name, value, .. } => Some((name.clone(), value.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(decls, [("color".to_string(), "blue".to_string())]);
}

#[test]
fn unknown_at_rules_are_skipped_with_a_warning() {
    let sink = parse("@whatever { some junk } div { color: red }");

    assert!(sink
        .events
        .iter()
        .any(|e| matches!(e, SinkEvent::Warning(_))));
    assert!(sink.events.iter().any(|e| matches!(
        e,
        SinkEvent::StartRule(list) if list.css_text() == "div"
    )));
}

#[test]
fn strict_mode_propagates_errors() {
    let mut config = corvus_css3::ParserConfig::default();
    config.ignore_errors = false;
    let parser = Css3Parser::new(config);

    let mut sink = CollectingSink::new();
    assert!(parser.parse_stylesheet("div { color: } ", &mut sink).is_err());
}

#[test]
fn selector_model_serializes_to_json() {
    simple_logger::SimpleLogger::new().init().ok();

    let list = Css3Parser::default()
        .parse_selector_list("div.note > p")
        .unwrap();
    let json = serde_json::to_value(&list).unwrap();
    assert!(json["selectors"].is_array());
    assert_eq!(json["selectors"].as_array().map(Vec::len), Some(1));
}

#[test]
fn unclosed_blocks_close_at_end_of_input() {
    let sink = parse("@media print { div { color: black ");

    assert!(matches!(
        sink.events.last(),
        Some(SinkEvent::EndAtRule(AtRule::Media(_)))
    ));
    assert!(sink.events.iter().any(|e| matches!(
        e,
        SinkEvent::Declaration { name, .. } if name == "color"
    )));
}
