#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let mut tokenizer = html::Tokenizer::new(input);
    let mut last = tokenizer.offset();
    while tokenizer.next().is_some() {
        let offset = tokenizer.offset();
        assert!(offset <= input.len());
        assert!(offset >= last, "tokenizer moved backwards");
        last = offset;
    }
});
