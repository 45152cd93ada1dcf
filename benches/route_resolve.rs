use criterion::{black_box, criterion_group, criterion_main, Criterion};
use spa_gateway::routing::{RequestPath, RouteTable};
use spa_gateway::{Gateway, GatewayRequest, MemoryStore, SiteConfig};

fn bench_path_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("path_parsing");

    for (name, path) in [
        ("root", "/"),
        ("single", "/main.8f3a1c.chunk.js"),
        ("three", "/static/media/logo.svg"),
        ("encoded", "/static/media/my%20logo%20final.svg"),
    ] {
        group.bench_function(name, |b| b.iter(|| black_box(RequestPath::parse(path))));
    }

    group.finish();
}

fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");
    let table = RouteTable::single_page_app("index.html").unwrap();

    for (name, path) in [
        ("root", "/"),
        ("single", "/favicon.ico"),
        ("dead_zone", "/assets/x"),
        ("three", "/static/css/main.css"),
    ] {
        let segments = RequestPath::parse(path).unwrap().into_segments();
        group.bench_function(name, |b| b.iter(|| black_box(table.resolve(&segments))));
    }

    group.finish();
}

fn bench_full_request(c: &mut Criterion) {
    let config = SiteConfig::from_toml_str(
        r#"
        domainName = "example.com"
        subdomain = "app"
        awsIpRanges = ["10.0.0.0/8"]
        bucketName = "app-example-assets"
        accountId = "123456789012"
        gatewayIdentity = "AROAGATEWAYROLE"
        "#,
    )
    .unwrap();
    let store = MemoryStore::new()
        .with_object("index.html", vec![b'x'; 4096])
        .with_object("static/js/main.js", vec![b'y'; 64 * 1024]);
    let gateway = Gateway::from_config(&config, store).unwrap();
    let ip = "10.2.3.4".parse().unwrap();

    let mut group = c.benchmark_group("gateway_handle");
    for (name, path) in [
        ("index", "/"),
        ("asset", "/static/js/main.js"),
        ("missing", "/static/js/none.js"),
        ("no_route", "/a/b"),
    ] {
        let request = GatewayRequest::get(path, ip);
        group.bench_function(name, |b| b.iter(|| black_box(gateway.handle(&request))));
    }
    group.finish();
}

criterion_group!(benches, bench_path_parsing, bench_resolution, bench_full_request);
criterion_main!(benches);
