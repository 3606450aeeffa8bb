use reactive_repository_deployment::GeneratorConfig;
use syn::{Attribute, ItemTrait, TraitItemFn, visit_mut::VisitMut};

/// Removes contract and query markers once the module has been indexed, so
/// they need not resolve as attributes in the expanded module.
pub(crate) struct MarkerStripper<'c> {
    config: &'c GeneratorConfig,
}

impl<'c> MarkerStripper<'c> {
    pub(crate) fn new(config: &'c GeneratorConfig) -> Self {
        Self { config }
    }

    fn is_marker(&self, attribute: &Attribute) -> bool {
        attribute.path().segments.last().is_some_and(|segment| {
            segment.ident == self.config.contract_marker || segment.ident == self.config.query_marker
        })
    }

    fn strip(&self, attrs: &mut Vec<Attribute>) {
        attrs.retain(|attribute| !self.is_marker(attribute));
    }
}

impl VisitMut for MarkerStripper<'_> {
    fn visit_item_trait_mut(&mut self, node: &mut ItemTrait) {
        self.strip(&mut node.attrs);
        syn::visit_mut::visit_item_trait_mut(self, node);
    }

    fn visit_trait_item_fn_mut(&mut self, node: &mut TraitItemFn) {
        self.strip(&mut node.attrs);
    }
}
