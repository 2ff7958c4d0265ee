use super::*;
use crate::error::Error;

/// A stand-in parser that knows a handful of dfns.
fn oracle(source: &str) -> Result<String> {
    let tree = match source {
        "double←{2×⍵}" => "Assign(double,Lam(App2(Times,2,Omega)))",
        "add←{⍺+⍵}" => "Assign(add,Lam(App2(Add,Alpha,Omega)))",
        "wave←{3○⍵}" => "Assign(wave,Lam(App2(Circ,3,Omega)))",
        "scan←{+\\⍵}" => "Assign(scan,Lam(App1(AppOpr1(Backslash,Add),Omega)))",
        other => {
            return Err(Error::ParserFailed {
                parser: "test".to_string(),
                status: Some(1),
                stderr: format!("cannot parse {}", other),
            })
        }
    };
    Ok(tree.to_string())
}

#[test]
fn test_differentiate_tree() {
    let gradient = differentiate_tree("Assign(double,Lam(App2(Times,2,Omega)))").unwrap();
    assert_eq!(gradient.name, "ddouble");
    assert_eq!(
        render_function(&gradient),
        "ddouble←{\n    ⍙1←2×⍵\n    ⍺←1+0×⍙1\n    ⍙dw←⍺×2\n    ⍙dw\n}"
    );
}

#[test]
fn test_malformed_tree_is_reported() {
    let err = differentiate_tree("Lam(App2(Times,2,Omega)").unwrap_err();
    assert!(matches!(err, Error::MalformedTree { .. }), "{}", err);
}

#[test]
fn test_forward_source_round_trips() {
    assert_eq!(
        forward_source("add←{⍺+⍵}", &oracle).unwrap(),
        "add←{\n    ⍺+⍵\n}"
    );
}

#[test]
fn test_file_with_several_dfns() {
    let text = "double←{2×⍵}\n⍝ a comment\nadd←{⍺+⍵}\n";
    let outcomes = differentiate_file(text, &oracle, true);
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(Outcome::is_ok));
    assert_eq!(outcomes[0].name, "double");
    assert_eq!(outcomes[1].span.range(), text.find("add").unwrap()..text.len() - 1);

    let joined = join_outputs(&outcomes);
    assert!(joined.starts_with("ddouble←{"));
    assert!(joined.contains("}\n\ndadd←{"));
    assert!(joined.ends_with("⍙da ⍙dw\n}"));
}

#[test]
fn test_failures_keep_going_by_request() {
    let text = "wave←{3○⍵}\ndouble←{2×⍵}\nscan←{+\\⍵}\n";
    let all = differentiate_file(text, &oracle, true);
    assert_eq!(all.len(), 3);
    assert!(matches!(all[0].result, Err(Error::UnsupportedTrig { .. })));
    assert!(all[1].is_ok());
    assert!(matches!(all[2].result, Err(Error::MissingAdjoint(_))));
    assert!(join_outputs(&all).starts_with("ddouble←{"));

    let stopped = differentiate_file(text, &oracle, false);
    assert_eq!(stopped.len(), 1);
}

#[test]
fn test_parser_failure_is_per_dfn() {
    let outcomes = differentiate_file("odd←{⍵⍵}\ndouble←{2×⍵}", &oracle, true);
    assert!(matches!(outcomes[0].result, Err(Error::ParserFailed { .. })));
    assert!(outcomes[1].is_ok());
}

#[test]
fn test_output_path_prefixes_the_file_name() {
    assert_eq!(
        output_path(Path::new("models/net.apl"), OUTPUT_PREFIX),
        PathBuf::from("models/dnet.apl")
    );
    assert_eq!(output_path(Path::new("net.apl"), "grad_"), PathBuf::from("grad_net.apl"));
}
