//! The list of pages the gallery can show.

use crate::page::Page;
use crate::pages::chapter01::MaterialsAnimation;
use crate::pages::chapter02::{BasicScene, MeshProperties};
use crate::pages::chapter03::PointLight;
use crate::pages::chapter04::{LineMaterial, MeshNormalMaterial, ShaderMaterial};
use crate::pages::chapter07::WeatherScene;

/// One fresh instance of every page.
fn all() -> Vec<Box<dyn Page>> {
    vec![
        Box::new(MaterialsAnimation::new()),
        Box::new(BasicScene::new()),
        Box::new(MeshProperties::new()),
        Box::new(PointLight::new()),
        Box::new(MeshNormalMaterial::new()),
        Box::new(ShaderMaterial::new()),
        Box::new(LineMaterial::new()),
        Box::new(WeatherScene::rainy()),
        Box::new(WeatherScene::snowy()),
    ]
}

/// `(id, title, chapter)` of every page, in chapter order.
pub fn pages() -> Vec<(&'static str, &'static str, u32)> {
    let mut pages: Vec<_> = all()
        .iter()
        .map(|page| (page.id(), page.title(), page.chapter()))
        .collect();
    pages.sort_by_key(|&(id, _, chapter)| (chapter, id));
    pages
}

/// A fresh instance of the page with this id.
pub fn create(id: &str) -> Option<Box<dyn Page>> {
    all().into_iter().find(|page| page.id() == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_unique() {
        let pages = pages();
        let ids: HashSet<_> = pages.iter().map(|(id, _, _)| *id).collect();
        assert_eq!(ids.len(), pages.len());
        assert_eq!(pages.len(), 9);
    }

    #[test]
    fn test_ids_carry_their_chapter() {
        for (id, _, chapter) in pages() {
            assert!(id.starts_with(&format!("chapter{:02}/", chapter)), "{}", id);
        }
    }

    #[test]
    fn test_create() {
        let page = create("chapter03/point-light").unwrap();
        assert_eq!(page.title(), "Point light");
        assert!(create("chapter99/missing").is_none());
    }
}
