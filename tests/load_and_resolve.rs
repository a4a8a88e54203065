use apisig::model::AliasState;
use apisig::{Config, Loader, MemoryProvider, ObjectKind, SourceErrorKind, Stats};

fn load(provider: MemoryProvider) -> apisig::LoadOutcome {
    Loader::new(Config::default()).load("pkg", &provider).unwrap()
}

#[test]
fn test_reexports_across_modules_resolve() {
    let provider = MemoryProvider::new()
        .package("pkg", "from .api import Client as Client\nfrom .api import helper\n")
        .module("pkg.api", "from ._impl import Client\n\ndef helper(x): pass\n")
        .module("pkg._impl", "class Client:\n    def send(self, data, *, timeout=None): pass\n");
    let outcome = load(provider);
    assert!(outcome.is_clean());

    let package = &outcome.package;
    let client = package.get_by_path("pkg.Client").unwrap();
    let alias = client.kind.as_alias().unwrap();
    assert!(alias.explicit_reexport);
    assert_eq!(
        alias.resolution,
        AliasState::Resolved {
            target: "pkg._impl.Client".into()
        }
    );
    assert!(package.is_public(client.id));

    // Imported without `as`: resolved, but not part of the public surface.
    let helper = package.get_by_path("pkg.helper").unwrap();
    assert!(!package.is_public(helper.id));
    assert!(package.is_resolved());
}

#[test]
fn test_mutual_imports_resolve() {
    let provider = MemoryProvider::new()
        .package("pkg", "")
        .module("pkg.a", "from pkg.b import B\n\nclass A:\n    pass\n")
        .module("pkg.b", "from pkg.a import A\n\nclass B(A):\n    pass\n");
    let outcome = load(provider);
    let package = &outcome.package;
    let b = package.id_of("pkg.b.B").unwrap();
    assert_eq!(package.mro(b).unwrap(), &["pkg.b.B", "pkg.a.A"]);
    assert!(outcome.resolution_errors.is_empty());
}

#[test]
fn test_alias_cycle_terminates() {
    let n = 8;
    let mut provider = MemoryProvider::new().package("pkg", "");
    for i in 0..n {
        let next = (i + 1) % n;
        provider = provider.module(&format!("pkg.m{i}"), &format!("from pkg.m{next} import thing\n"));
    }
    let outcome = load(provider);
    assert_eq!(outcome.resolution_errors.len(), n);
    for i in 0..n {
        let alias = outcome
            .package
            .get_by_path(&format!("pkg.m{i}.thing"))
            .and_then(|e| e.kind.as_alias())
            .unwrap();
        assert_eq!(alias.resolution, AliasState::External);
    }
}

#[test]
fn test_diamond_from_source() {
    let provider = MemoryProvider::new().package(
        "pkg",
        r#"
class A:
    def greet(self): pass

class B(A):
    def greet(self): pass

class C(A):
    def greet(self): pass

class D(B, C):
    pass
"#,
    );
    let outcome = load(provider);
    let package = &outcome.package;
    let d = package.id_of("pkg.D").unwrap();
    assert_eq!(package.mro(d).unwrap(), &["pkg.D", "pkg.B", "pkg.C", "pkg.A"]);
    assert_eq!(
        package.inherited_members(d).unwrap().get("greet").map(String::as_str),
        Some("pkg.B.greet")
    );
}

#[test]
fn test_resolution_is_idempotent() {
    let provider = MemoryProvider::new()
        .package("pkg", "from .core import Engine as Engine\nimport json\n")
        .module("pkg.core", "class Base:\n    x = 1\n\nclass Engine(Base, dict):\n    pass\n");
    let loader = Loader::new(Config::default());
    let first = loader.load("pkg", &provider).unwrap().package;
    let second = loader.resolve(first.clone()).unwrap();
    assert_eq!(second.package.to_tree(), first.to_tree());
    assert_eq!(second.package.derived(), first.derived());
    assert!(second.errors.is_empty());
}

#[test]
fn test_syntax_error_keeps_siblings() {
    let provider = MemoryProvider::new()
        .package("pkg", "")
        .module("pkg.broken", "class Oops(\n")
        .module("pkg.fine", "VALUE = 1\n");
    let outcome = load(provider);
    assert_eq!(outcome.source_errors.len(), 1);
    assert_eq!(outcome.source_errors[0].kind, SourceErrorKind::Syntax);
    assert_eq!(outcome.source_errors[0].origin_path, "pkg/broken.py");
    assert!(outcome.package.get_by_path("pkg.fine.VALUE").is_some());
    assert!(outcome.package.get_by_path("pkg.broken").is_none());
}

#[test]
fn test_parameter_order_defect_is_a_source_error() {
    // Python rejects `def f(**kw, a)`; the grammar does not.
    let provider = MemoryProvider::new()
        .package("pkg", "")
        .module("pkg.odd", "def f(**kw, a): pass\n")
        .module("pkg.ok", "def g(a, /, b, *, c): pass\n");
    let outcome = load(provider);
    assert_eq!(outcome.source_errors.len(), 1);
    assert_eq!(outcome.source_errors[0].kind, SourceErrorKind::ParameterOrder);
    assert_eq!(outcome.source_errors[0].qualified_name, "pkg.odd.f");
    assert!(outcome.package.get_by_path("pkg.odd").is_none());
    assert!(outcome.package.get_by_path("pkg.ok.g").is_some());
}

#[test]
fn test_stats_after_load() {
    let provider = MemoryProvider::new().package(
        "pkg",
        "import os\n\nclass K(object):\n    attr: int = 0\n\n    def m(self, x): pass\n",
    );
    let outcome = load(provider);
    let stats = Stats::collect(&outcome.package);
    assert_eq!(stats.modules, 1);
    assert_eq!(stats.classes, 1);
    assert_eq!(stats.functions, 1);
    assert_eq!(stats.parameters, 2);
    assert_eq!(stats.attributes, 1);
    assert_eq!(stats.aliases.external, 2);
    assert_eq!(stats.aliases.unresolved, 0);

    let k = outcome.package.get_by_path("pkg.K").unwrap();
    assert!(matches!(k.kind, ObjectKind::Class(_)));
}

#[test]
fn test_required_parameter_after_default_is_a_source_error() {
    let provider = MemoryProvider::new()
        .package("pkg", "")
        .module("pkg.odd", "def g(a=1, b): pass\n")
        .module("pkg.ok", "def h(a=1, *, b): pass\n");
    let outcome = load(provider);
    assert_eq!(outcome.source_errors.len(), 1);
    assert_eq!(outcome.source_errors[0].kind, SourceErrorKind::ParameterOrder);
    assert_eq!(outcome.source_errors[0].qualified_name, "pkg.odd.g");
    assert!(outcome.package.get_by_path("pkg.ok.h").is_some());
}
