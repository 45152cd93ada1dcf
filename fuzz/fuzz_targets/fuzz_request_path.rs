#![no_main]
use libfuzzer_sys::fuzz_target;
use spa_gateway::routing::{RequestPath, RouteTable};

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };

    let Ok(path) = RequestPath::parse(raw) else {
        return;
    };

    // Accepted segments never smuggle separators or traversal
    for segment in path.segments() {
        assert!(!segment.is_empty());
        assert!(segment != "." && segment != "..");
        assert!(!segment.contains('/') && !segment.contains('\\'));
    }

    let table = RouteTable::single_page_app("index.html").unwrap();
    if let Ok(target) = table.resolve(path.segments()) {
        assert!(!target.key.starts_with('/'));
        assert!(!target.key.split('/').any(|part| part == ".."));
    }
});
