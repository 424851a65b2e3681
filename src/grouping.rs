use std::collections::BTreeMap;

use regex::Regex;

use crate::models::{ImageGroup, PerRegistryImages, RegistryKind, RegistryMap};

/// Extract the base image name from a full registry path.
///
/// `ghcr.io/user/app` and `registry.gitlab.com/user/project/app` both map
/// to `app`; a name without separators is returned unchanged.
pub fn extract_base_name(full_name: &str) -> &str {
    full_name
        .split('/')
        .rev()
        .find(|segment| !segment.is_empty())
        .unwrap_or(full_name)
}

/// Group images by base name across registries.
///
/// Images with the same base name from different registries land in one
/// group. Registries fold in fixed order (GHCR, GitLab, Docker Hub); a
/// duplicate base name within one registry overwrites the earlier entry.
/// The result is sorted ascending by base name.
pub fn group_images_by_name(images: &PerRegistryImages) -> Vec<ImageGroup> {
    let mut groups: BTreeMap<String, ImageGroup> = BTreeMap::new();

    let sources = [
        (RegistryKind::Ghcr, &images.ghcr),
        (RegistryKind::GitlabRegistry, &images.gitlab),
        (RegistryKind::DockerHub, &images.docker_hub),
    ];

    for (kind, list) in sources {
        for image in list {
            let base_name = extract_base_name(&image.name);
            let group = groups
                .entry(base_name.to_string())
                .or_insert_with(|| ImageGroup {
                    base_name: base_name.to_string(),
                    registries: RegistryMap::default(),
                    total_versions: 0,
                });
            group.total_versions += image.tags.len();
            group.registries.set(kind, image.clone());
        }
    }

    groups.into_values().collect()
}

/// Narrow groups to those whose base name matches the pattern.
pub fn filter_groups(groups: Vec<ImageGroup>, pattern: Option<&Regex>) -> Vec<ImageGroup> {
    match pattern {
        Some(re) => groups
            .into_iter()
            .filter(|group| re.is_match(&group.base_name))
            .collect(),
        None => groups,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RegistryImage;

    fn image(name: &str, tags: &[&str]) -> RegistryImage {
        RegistryImage {
            id: None,
            name: name.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            created_at: None,
        }
    }

    #[test]
    fn test_base_name_strips_registry_prefix() {
        assert_eq!(extract_base_name("ghcr.io/user/foo"), "foo");
        assert_eq!(extract_base_name("registry.gitlab.com/user/project/app"), "app");
        assert_eq!(extract_base_name("user/foo"), "foo");
        assert_eq!(extract_base_name("foo"), "foo");
        assert_eq!(extract_base_name(""), "");
    }

    #[test]
    fn test_groups_merge_across_registries() {
        let images = PerRegistryImages {
            ghcr: vec![image("a/x", &["1", "2"])],
            gitlab: vec![image("b/x", &["1"])],
            docker_hub: vec![],
        };

        let groups = group_images_by_name(&images);
        assert_eq!(groups.len(), 1);

        let group = &groups[0];
        assert_eq!(group.base_name, "x");
        assert_eq!(group.total_versions, 3);
        assert!(group.registries.ghcr.is_some());
        assert!(group.registries.gitlab.is_some());
        assert!(group.registries.docker_hub.is_none());
    }

    #[test]
    fn test_groups_sorted_by_base_name() {
        let images = PerRegistryImages {
            ghcr: vec![image("u/zeta", &["1"]), image("u/alpha", &[])],
            gitlab: vec![image("g/p/mid", &["a", "b"])],
            docker_hub: vec![image("beta", &["latest"])],
        };

        let groups = group_images_by_name(&images);
        let names: Vec<&str> = groups.iter().map(|g| g.base_name.as_str()).collect();
        assert_eq!(names, ["alpha", "beta", "mid", "zeta"]);

        let totals: Vec<usize> = groups.iter().map(|g| g.total_versions).collect();
        assert_eq!(totals, [0, 1, 2, 1]);
    }

    #[test]
    fn test_duplicate_base_name_within_registry_keeps_last() {
        let images = PerRegistryImages {
            ghcr: vec![image("a/x", &["1"]), image("b/x", &["2", "3"])],
            gitlab: vec![],
            docker_hub: vec![],
        };

        let groups = group_images_by_name(&images);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].total_versions, 3);
        assert_eq!(groups[0].registries.ghcr.as_ref().unwrap().name, "b/x");
    }

    #[test]
    fn test_grouping_is_idempotent() {
        let images = PerRegistryImages {
            ghcr: vec![image("a/x", &["1", "2"]), image("a/y", &[])],
            gitlab: vec![image("b/x", &["1"])],
            docker_hub: vec![image("z", &["latest"])],
        };

        assert_eq!(group_images_by_name(&images), group_images_by_name(&images));
    }

    #[test]
    fn test_empty_input_produces_no_groups() {
        assert!(group_images_by_name(&PerRegistryImages::default()).is_empty());
    }

    #[test]
    fn test_filter_narrows_by_base_name() {
        let images = PerRegistryImages {
            ghcr: vec![image("u/app-web", &[]), image("u/app-api", &[]), image("u/tool", &[])],
            gitlab: vec![],
            docker_hub: vec![],
        };

        let groups = group_images_by_name(&images);
        let re = Regex::new("^app-").unwrap();
        let filtered = filter_groups(groups.clone(), Some(&re));
        let names: Vec<&str> = filtered.iter().map(|g| g.base_name.as_str()).collect();
        assert_eq!(names, ["app-api", "app-web"]);

        assert_eq!(filter_groups(groups.clone(), None).len(), 3);
    }
}
