//! End-to-end formatting tests.

mod common;
use common::*;

use tsqlfmt_core::{FormatOptions, FormattingManager, StandardFormatter};

const TRACED: &[&str] = &[
    "select a,b from t where a=1",
    "select * from a inner join b on a.x = b.x and a.y = b.y",
    "select case when a = 1 then 'x' else 'y' end from t",
    "if @a = 1 print 'x' else print 'y'",
    "if @a = 1 begin print 'x' end",
    "select a\n-- the source\nfrom t",
];

#[test]
fn scenario_default_options() {
    assert_eq!(
        format("select a,b from t where a=1"),
        "SELECT\n\ta\n\t,b\nFROM\n\tt\nWHERE\n\ta = 1\n"
    );
}

#[test]
fn formatting_is_idempotent() {
    for sql in TRACED {
        let once = format(sql);
        assert_eq!(format(&once), once, "not idempotent for: {sql}");
    }
}

#[test]
fn identity_round_trip() {
    for sql in [
        "select a,b from t where a=1",
        "SELECT 1 -- trailing\n; SELECT 2",
        "create procedure dbo.p @a int = 1 as\nbegin\n  set nocount on;\n  select [x]] y] from t\nend\ngo\n",
        "with a as (select 1 x), b (y) as (select x from a) select * from b",
        "merge t using s on t.id = s.id when matched then update set a = s.a;",
        "declare c cursor for select a from t for update of a\nopen c",
        "grant select, insert on t to u with grant option",
        "begin try\n\tselect 1/0\nend try\nbegin catch\n\tprint N'caught'\nend catch",
        "select \"q\"\"x\", 0x1f, $2.50, 1e3 from t // c-style\n",
    ] {
        assert_eq!(identity(sql), sql);
    }
}

#[test]
fn keywords_are_case_normalized() {
    let output = format("select * from Foo join [Bar] on Foo.id = [Bar].id");
    assert!(output.starts_with("SELECT\n"));
    assert!(output.contains("\nFROM\n"));
    assert!(output.contains("\tFoo\n"));
    assert!(output.contains("JOIN [Bar] ON Foo.id = [Bar].id"));

    let options = FormatOptions {
        uppercase_keywords: false,
        ..FormatOptions::default()
    };
    let output = format_with("SELECT * FROM Foo", options);
    assert_eq!(output, "select\n\t*\nfrom\n\tFoo\n");
}

#[test]
fn noformat_region_is_verbatim() {
    let region = "/*[noformat]*/select   x,y   from t/*[/noformat]*/";
    let sql = format!("select 1\n{region}\nselect 2");
    for options in [
        FormatOptions::default(),
        FormatOptions {
            uppercase_keywords: false,
            trailing_commas: true,
            ..FormatOptions::default()
        },
        FormatOptions {
            indent_string: "  ".to_string(),
            max_line_width: 10,
            ..FormatOptions::default()
        },
    ] {
        let output = format_with(&sql, options);
        assert!(output.contains(region), "region lost in: {output:?}");
    }
}

#[test]
fn lines_respect_max_width() {
    let options = FormatOptions {
        max_line_width: 20,
        expand_comma_lists: false,
        ..FormatOptions::default()
    };
    let output = format_with(
        "select aaaa, bbbb, cccc, dddd, eeee, ffff, gggg from tttt where aaaa = 1 and bbbb = 2",
        options,
    );
    for line in output.lines() {
        let width = line.trim_end().replace('\t', "    ").chars().count();
        assert!(width <= 20, "line too wide: {line:?}");
    }
}

#[test]
fn malformed_input_still_formats() {
    for sql in ["select 'abc", "select (1", "select 1)", "select 1 end"] {
        let outcome = format_outcome(sql, FormatOptions::default());
        assert!(outcome.parse_error);
        assert!(outcome.text.starts_with("--WARNING! ERRORS ENCOUNTERED DURING SQL PARSING!\n"));
        assert!(outcome.text.len() > "--WARNING! ERRORS ENCOUNTERED DURING SQL PARSING!\n".len());
    }
}

#[test]
fn custom_error_banner() {
    let formatter = StandardFormatter::new(FormatOptions::default()).with_error_output_prefix("-- check me");
    let outcome = FormattingManager::new(formatter).format("select 'abc").unwrap();
    assert!(outcome.text.starts_with("-- check me\nSELECT"));
}

#[test]
fn own_line_comment_stays_on_own_line() {
    assert_eq!(
        format("select a\n-- the source\nfrom t"),
        "SELECT\n\ta\n-- the source\nFROM\n\tt\n"
    );
}

#[test]
fn spaces_for_indentation() {
    let options = FormatOptions {
        indent_string: "    ".to_string(),
        ..FormatOptions::default()
    };
    assert_eq!(
        format_with("select a,b from t where a=1", options),
        "SELECT\n    a\n    ,b\nFROM\n    t\nWHERE\n    a = 1\n"
    );
}

#[test]
fn brackets_wrap_bare_names() {
    let options = FormatOptions {
        wrap_names_in_brackets: true,
        ..FormatOptions::default()
    };
    assert_eq!(
        format_with("select a from t where @v = 1", options),
        "SELECT\n\t[a]\nFROM\n\t[t]\nWHERE\n\t@v = 1\n"
    );
}
