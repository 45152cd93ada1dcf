//! Property-based tests for path parsing and route resolution
//!
//! Uses proptest to check the resolver's depth rules over arbitrary segments

use proptest::prelude::*;
use spa_gateway::routing::{RequestPath, RouteTable};
use spa_gateway::GatewayError;

/// Segment text that survives the path boundary unchanged
fn segment() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_~-][A-Za-z0-9._~-]{0,24}".prop_filter("dot segments", |s| s != "." && s != "..")
}

fn table() -> RouteTable {
    RouteTable::single_page_app("index.html").unwrap()
}

#[test]
fn zero_segments_resolve_to_index() {
    for raw in ["", "/"] {
        let path = RequestPath::parse(raw).unwrap();
        assert_eq!(table().resolve(path.segments()).unwrap().key, "index.html");
    }
}

proptest! {
    #[test]
    fn prop_single_segment_is_identity(name in segment()) {
        let path = RequestPath::parse(&format!("/{}", name)).unwrap();
        prop_assert_eq!(table().resolve(path.segments()).unwrap().key, name);
    }

    #[test]
    fn prop_two_segments_never_match(a in segment(), b in segment()) {
        let path = RequestPath::parse(&format!("/{}/{}", a, b)).unwrap();
        let err = table().resolve(path.segments()).unwrap_err();
        prop_assert!(matches!(err, GatewayError::NoRouteMatch(_)));
    }

    #[test]
    fn prop_three_segments_join(a in segment(), b in segment(), c in segment()) {
        let path = RequestPath::parse(&format!("/{}/{}/{}", a, b, c)).unwrap();
        prop_assert_eq!(
            table().resolve(path.segments()).unwrap().key,
            format!("{}/{}/{}", a, b, c)
        );
    }

    #[test]
    fn prop_deeper_paths_never_match(parts in prop::collection::vec(segment(), 4..16)) {
        let path = RequestPath::parse(&format!("/{}", parts.join("/"))).unwrap();
        prop_assert!(table().resolve(path.segments()).is_err());
    }

    #[test]
    fn prop_encoded_slash_never_adds_depth(a in segment(), b in segment()) {
        for raw in [format!("/{}%2F{}", a, b), format!("/{}%2f{}", a, b), format!("/{}%5C{}", a, b)] {
            let err = RequestPath::parse(&raw).unwrap_err();
            prop_assert!(matches!(err, GatewayError::InvalidPath(_)));
        }
    }

    #[test]
    fn prop_percent_encoding_decodes_once(name in segment()) {
        let encoded: String = name.bytes().map(|b| format!("%{:02X}", b)).collect();
        let path = RequestPath::parse(&format!("/{}", encoded)).unwrap();
        prop_assert_eq!(path.segments(), &[name][..]);
    }

    #[test]
    fn prop_parse_never_panics(raw in "\\PC{0,64}") {
        let _ = RequestPath::parse(&raw);
    }
}
