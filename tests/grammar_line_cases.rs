//! Parameterized grammar-line shape cases

use rstest::rstest;

use gedcom::gedcom::grammar::line::{GrammarLine, UNBOUNDED};
use gedcom::gedcom::grammar::GrammarOptions;

fn parse(text: &str) -> GrammarLine {
    GrammarLine::parse(text, 1, GrammarOptions::default()).expect("line parses")
}

#[rstest]
#[case("HEAD {1:1}", "HEAD", 1, 1)]
#[case("CHIL @<XREF:INDI>@ {0:M}", "CHIL", 0, UNBOUNDED)]
#[case("SOUR <APPROVED_SYSTEM_ID> {1:1}", "SOUR", 1, 1)]
#[case("PHON <PHONE_NUMBER> {0:3}", "PHON", 0, 3)]
#[case("ADR1 <ADDRESS_LINE1> {0:1}", "ADR1", 0, 1)]
fn tag_lines(
    #[case] text: &str,
    #[case] tag: &str,
    #[case] min: i32,
    #[case] max: i32,
) {
    let line = parse(text);
    assert!(line.has_tag(tag));
    assert_eq!(line.min(), min);
    assert_eq!(line.max(), max);
    assert!(line.structure_name().is_none());
}

#[rstest]
#[case("<<HEADER>> {1:1}", "HEADER")]
#[case("<<PERSONAL_NAME_STRUCTURE>> {0:M}", "PERSONAL_NAME_STRUCTURE")]
#[case("<<EVENT_DETAIL>> {0:1}", "EVENT_DETAIL")]
fn structure_references(#[case] text: &str, #[case] name: &str) {
    let line = parse(text);
    assert_eq!(line.structure_name(), Some(name));
    assert_eq!(line.id(), name);
}

#[rstest]
#[case("[ANUL|CENS|DIV] {1:1}", &["ANUL", "CENS", "DIV"])]
#[case("[BIRT|CHR] [Y|<NULL>] {1:1}", &["BIRT", "CHR"])]
#[case("[CONC|CONT] <TEXT_FROM_SOURCE> {0:M}", &["CONC", "CONT"])]
fn tag_alternatives(#[case] text: &str, #[case] tags: &[&str]) {
    let line = parse(text);
    for tag in tags {
        assert!(line.has_tag(tag), "missing {tag} in '{text}'");
    }
}

#[rstest]
#[case("DATE [<DATE_VALUE>|<DATE_PERIOD>] {0:1}", &["DATE_VALUE", "DATE_PERIOD"])]
#[case("NOTE [<SUBMITTER_TEXT>|<NULL_VALUE>] {0:M}", &["SUBMITTER_TEXT", "NULL_VALUE"])]
fn value_alternatives(#[case] text: &str, #[case] names: &[&str]) {
    let line = parse(text);
    for name in names {
        assert!(line.value_names().contains(*name), "missing {name}");
    }
}

#[rstest]
#[case("ASSO @<XREF:INDI>@ {1:1}", &["XREF:INDI"])]
#[case("[@<XREF:FAM>@|@<XREF:INDI>@] {0:1}", &["XREF:FAM", "XREF:INDI"])]
fn xref_shapes(#[case] text: &str, #[case] names: &[&str]) {
    let line = parse(text);
    for name in names {
        assert!(line.xref_names().contains(*name), "missing {name}");
    }
}

#[rstest]
#[case("MARR [Y|<NULL>] {1:1}")]
#[case("DEAT [Y|<NULL>] {1:1}")]
fn null_value_possibility(#[case] text: &str) {
    let line = parse(text);
    assert!(line.value_possibilities().contains(&None));
    assert!(line.value_possibilities().contains(&Some("Y".to_owned())));
}

#[rstest]
#[case("")]
#[case("A B C D E")]
fn invalid_token_counts(#[case] text: &str) {
    assert!(GrammarLine::parse(text, 1, GrammarOptions::default()).is_err());
}

#[test]
fn identity_rendering_roundtrips_cardinality() {
    let line = parse("CHIL @<XREF:INDI>@ {0:M}");
    let rendered = line.to_string();
    assert!(rendered.contains("[CHIL]"));
    assert!(rendered.contains("{0:M}"));
}
