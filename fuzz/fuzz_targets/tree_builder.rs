#![no_main]

use html::{Replacer, Strainer, TreeBuilderConfig, parse, to_markup};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let config = TreeBuilderConfig::default()
        .with_filter(Strainer::names(["script", "nav"]).negate())
        .with_rewriter(Replacer::new("b", "strong"));
    let Ok(doc) = parse(input, &config) else {
        panic!("built-in policies never fail");
    };
    assert!(doc.root().find("script").is_none());
    assert!(doc.root().find("b").is_none());

    let markup = to_markup(&doc);
    assert!(parse(&markup, &TreeBuilderConfig::default()).is_ok());
});
