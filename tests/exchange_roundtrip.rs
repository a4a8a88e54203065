use apisig::serialize::{from_exchange, from_json_str, to_exchange, to_json_string};
use apisig::{check, Config, DiffConfig, Loader, MemoryProvider, Package};

const SOURCE: &str = r#""""Top-level docs."""
from .shapes import Circle as Circle
from . import shapes

__all__ = ["Circle", "area"]

def area(shape: "Circle", *, precision: int = 2) -> float:
    """Area of a shape."""
    return 0.0
"#;

const SHAPES: &str = r#"
import math
from typing import overload

class Shape:
    sides: int = 0

    def __init__(self, name):
        self.name = name

class Circle(Shape, metaclass=type):
    @overload
    def scale(self, k: int) -> "Circle": ...
    @overload
    def scale(self, k: float) -> "Circle": ...
    def scale(self, k):
        return self

    async def render(self, /, target, **options): ...
"#;

fn provider() -> MemoryProvider {
    MemoryProvider::new()
        .package("geo", SOURCE)
        .module("geo.shapes", SHAPES)
}

fn unresolved() -> Package {
    let (package, errors) = apisig::graph::build_package("geo", &provider(), &Config::default()).unwrap();
    assert!(errors.is_empty());
    package
}

fn resolved() -> Package {
    Loader::new(Config::default())
        .load("geo", &provider())
        .unwrap()
        .package
}

#[test]
fn test_unresolved_round_trip() {
    let package = unresolved();
    assert!(!package.is_resolved());
    let back = from_exchange(to_exchange(&[&package]).unwrap()).unwrap();
    assert_eq!(back.len(), 1);
    assert_eq!(back[0].to_tree(), package.to_tree());
}

#[test]
fn test_resolved_round_trip_through_text() {
    let package = resolved();
    assert!(package.is_resolved());
    let text = to_json_string(&[&package]).unwrap();
    let back = from_json_str(&text).unwrap();
    assert_eq!(back[0].to_tree(), package.to_tree());
    assert_eq!(back[0].name(), "geo");

    // Derived views are not stored but come back from resolving again.
    let again = Loader::new(Config::default()).resolve(back.into_iter().next().unwrap()).unwrap();
    assert_eq!(again.package.derived(), package.derived());
}

#[test]
fn test_exchange_shape() {
    let value = to_exchange(&[&resolved()]).unwrap();
    let root = &value["geo"];
    assert_eq!(root["kind"], "module");
    assert_eq!(root["docstring"], "Top-level docs.");
    assert_eq!(root["exports"][0], "Circle");

    let members = root["members"].as_array().unwrap();
    let circle = members.iter().find(|m| m["name"] == "Circle").unwrap();
    assert_eq!(circle["kind"], "alias");
    assert_eq!(circle["target"], "geo.shapes.Circle");
    assert_eq!(circle["resolution"]["state"], "resolved");
    assert_eq!(circle["resolution"]["target"], "geo.shapes.Circle");

    let area = members.iter().find(|m| m["name"] == "area").unwrap();
    let params = area["signatures"][0]["parameters"].as_array().unwrap();
    assert_eq!(params[1]["kind"], "keyword-only");
    assert_eq!(params[1]["default"], "2");
    assert_eq!(area["signatures"][0]["returns"], "float");
}

#[test]
fn test_package_read_back_diffs_clean() {
    let package = resolved();
    let back = from_json_str(&to_json_string(&[&package]).unwrap()).unwrap();
    assert!(check(&package, &back[0], &DiffConfig::default()).is_empty());
}

#[test]
fn test_several_packages_in_one_tree() {
    let a = resolved();
    let b = Loader::new(Config::default())
        .load("other", &MemoryProvider::new().package("other", "X = 1\n"))
        .unwrap()
        .package;
    let back = from_exchange(to_exchange(&[&a, &b]).unwrap()).unwrap();
    let mut names: Vec<&str> = back.iter().map(|p| p.name()).collect();
    names.sort();
    assert_eq!(names, vec!["geo", "other"]);
}
