//! Joins a code template (a sequence of fixed and editable `Region`s) with the fragments a user
//! submitted for its editable regions, producing a single compilable source file.
//!

use super::Region;

error_chain! {
    types {
        Error, ErrorKind, ResultExt, Result;
    }

    errors {
        TemplateMismatch(expected: usize, got: usize) {
            description("number of submitted fragments does not match the template's editable \
                region count")
            display("template has {} editable region(s) but {} fragment(s) were submitted",
                expected, got)
        }
    }
}

const INDENT_WIDTH: usize = 4;

/// Join `regions` with `fragments`, one fragment per editable region in order.
///
/// Every region, fixed or editable, contributes exactly one line to the output: `indent * 4`
/// leading spaces followed by its content (the region's fixed content, or the next unconsumed
/// fragment) and a trailing newline.
pub fn join_code_template(regions: &[Region], fragments: &[String]) -> Result<String> {
    let editable_count = regions.iter()
        .filter(|r| matches!(r, Region::Editable { .. }))
        .count();
    if editable_count != fragments.len() {
        bail!(ErrorKind::TemplateMismatch(editable_count, fragments.len()));
    }

    let mut out = String::new();
    let mut fragments = fragments.iter();

    for region in regions {
        match region {
            Region::Fixed { indent, content } => {
                out.push_str(&" ".repeat(indent * INDENT_WIDTH));
                out.push_str(content);
            },
            Region::Editable { indent } => {
                out.push_str(&" ".repeat(indent * INDENT_WIDTH));
                // `editable_count == fragments.len()` was checked above, so this never misses.
                out.push_str(fragments.next().expect("editable region count was checked"));
            }
        }
        out.push('\n');
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_fixed_and_editable_regions() {
        let regions = vec![
            Region::Fixed { indent: 0, content: "int main() {".to_owned() },
            Region::Editable { indent: 1 },
            Region::Fixed { indent: 0, content: "}".to_owned() },
        ];
        let fragments = vec!["return 0;".to_owned()];

        let joined = join_code_template(&regions, &fragments).unwrap();
        assert_eq!(joined, "int main() {\n    return 0;\n}\n");
    }

    #[test]
    fn rejects_fragment_count_mismatch() {
        let regions = vec![Region::Editable { indent: 0 }];
        let fragments = vec!["a".to_owned(), "b".to_owned()];

        assert!(join_code_template(&regions, &fragments).is_err());
    }

    #[test]
    fn indentation_is_four_spaces_per_level() {
        let regions = vec![Region::Editable { indent: 2 }];
        let fragments = vec!["x".to_owned()];

        let joined = join_code_template(&regions, &fragments).unwrap();
        assert_eq!(joined, "        x\n");
    }
}
