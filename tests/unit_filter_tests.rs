//! # Filter Module Unit Tests / Filter 模块单元测试
//!
//! Tests for the fnmatch-style glob matcher and the include/exclude filter.
//!
//! 测试 fnmatch 风格的通配符匹配器以及包含/排除过滤器。

use testr::core::filter::{InclusionFilter, glob_match, has_glob_chars};

#[cfg(test)]
mod glob_tests {
    use super::*;

    #[test]
    fn test_literal_and_wildcards() {
        assert!(glob_match("test_basic.py", "test_basic.py", false));
        assert!(!glob_match("test_basic.py", "test_basic.sh", false));
        assert!(glob_match("test_*", "test_basic.py", false));
        assert!(glob_match("*.py", "test_basic.py", false));
        assert!(glob_match("test_?.sh", "test_1.sh", false));
        assert!(!glob_match("test_?.sh", "test_10.sh", false));
        assert!(glob_match("*", "", false));
        assert!(!glob_match("?", "", false));
    }

    #[test]
    fn test_character_classes() {
        assert!(glob_match("test_[abc].py", "test_b.py", false));
        assert!(!glob_match("test_[abc].py", "test_d.py", false));
        assert!(glob_match("test_[0-9].py", "test_7.py", false));
        assert!(glob_match("test_[!0-9].py", "test_x.py", false));
        assert!(!glob_match("test_[!0-9].py", "test_3.py", false));
        assert!(glob_match("test_[^a].py", "test_b.py", false));
    }

    #[test]
    fn test_star_backtracking() {
        assert!(glob_match("*a*b*c", "xxaxxbxxc", false));
        assert!(!glob_match("*a*b*c", "xxaxxcxxb", false));
        assert!(glob_match("demo/test_broken*", "demo/test_broken.py", false));
    }

    #[test]
    fn test_separator_awareness() {
        // Plain fnmatch: `*` crosses `/`.
        assert!(glob_match("*.png", "plots/a.png", false));
        // Path glob: `*` stays within one component.
        assert!(!glob_match("*.png", "plots/a.png", true));
        assert!(glob_match("plots/*.png", "plots/a.png", true));
        assert!(!glob_match("plots?a.png", "plots/a.png", true));
    }

    #[test]
    fn test_has_glob_chars() {
        assert!(has_glob_chars("*.log"));
        assert!(has_glob_chars("test_?.sh"));
        assert!(has_glob_chars("[ab].txt"));
        assert!(!has_glob_chars("test_unit.py.log"));
    }
}

#[cfg(test)]
mod inclusion_filter_tests {
    use super::*;

    #[test]
    fn test_empty_includes_select_everything() {
        let filter = InclusionFilter::default();
        assert!(filter.is_included("demo", "test_basic.py"));
        assert!(filter.is_included("other", "post_check.sh"));
    }

    #[test]
    fn test_include_patterns_are_right_open() {
        let filter = InclusionFilter::new(vec!["demo/test_basic".to_string()], vec![]);
        assert!(filter.is_included("demo", "test_basic.py"));
        assert!(!filter.is_included("demo", "test_broken.py"));
        assert!(!filter.is_included("other", "test_basic.py"));
    }

    #[test]
    fn test_include_whole_package() {
        let filter = InclusionFilter::new(vec!["demo/".to_string()], vec![]);
        assert!(filter.is_included("demo", "test_basic.py"));
        assert!(!filter.is_included("demo2", "test_basic.py"));
    }

    #[test]
    fn test_exclude_wins_over_include() {
        let filter = InclusionFilter::new(
            vec!["*".to_string()],
            vec!["demo/test_broken*".to_string()],
        );
        assert!(filter.is_included("demo", "test_basic.py"));
        assert!(!filter.is_included("demo", "test_broken.py"));
    }

    #[test]
    fn test_filter_is_deterministic() {
        let filter = InclusionFilter::new(
            vec!["demo/*".to_string(), "other/test_a".to_string()],
            vec!["*post_".to_string()],
        );
        for _ in 0..3 {
            assert!(filter.is_included("demo", "test_x.sh"));
            assert!(!filter.is_included("demo", "post_x.sh"));
            assert!(filter.is_included("other", "test_a.py"));
        }
    }

    #[test]
    fn test_pattern_order_does_not_matter() {
        let includes = vec!["demo/".to_string(), "other/test_a".to_string()];
        let excludes = vec!["demo/test_broken".to_string(), "*post_".to_string()];
        let forward = InclusionFilter::new(includes.clone(), excludes.clone());
        let reversed = InclusionFilter::new(
            includes.into_iter().rev().collect(),
            excludes.into_iter().rev().collect(),
        );

        for (package, file) in [
            ("demo", "test_basic.py"),
            ("demo", "test_broken.py"),
            ("demo", "post_check.sh"),
            ("other", "test_a.py"),
            ("other", "test_b.py"),
        ] {
            assert_eq!(
                forward.is_included(package, file),
                reversed.is_included(package, file),
                "{package}/{file}"
            );
        }
    }
}
