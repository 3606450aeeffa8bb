//! Runtime `Query` construction for derived and declared queries.

use std::collections::HashMap;

use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};
use syn::{Path, Type};

use crate::resolve::{Comparator, Direction, ParamRole, Predicate, QueryPlan, ResolvedParam};

pub(crate) struct QueryTokens<'a> {
    pub runtime: &'a Path,
    pub params: &'a [ResolvedParam],
}

impl QueryTokens<'_> {
    /// Expression building the runtime query for `plan`. `limit` is applied
    /// last and overrides both the plan's limit and any call-time page size.
    pub(crate) fn build(&self, plan: &QueryPlan, limit: Option<usize>) -> TokenStream {
        let rt = self.runtime;
        let uses = self.param_uses(plan);

        let mut filter = quote!(#rt::query::Filter::all());
        for (group_index, group) in plan.groups.iter().enumerate() {
            for (predicate_index, predicate) in group.iter().enumerate() {
                let condition = self.condition(predicate, &uses);
                filter = if group_index > 0 && predicate_index == 0 {
                    quote!(#filter.or(#condition))
                } else {
                    quote!(#filter.and(#condition))
                };
            }
        }

        let orders = plan.order.iter().map(|key| {
            let property = &key.property;
            let direction = match key.direction {
                Direction::Asc => quote!(asc),
                Direction::Desc => quote!(desc),
            };
            quote!(.order_by(#rt::query::Order::#direction(#property)))
        });
        let plan_limit = plan.limit.map(|limit| quote!(.with_limit(#limit)));
        let sorted = self
            .directive(&ParamRole::Sort)
            .map(|sort| quote!(.sorted(#sort)));
        let paged = self
            .directive(&ParamRole::Page)
            .map(|page| quote!(.paged(#page)));
        let limit = limit.map(|limit| quote!(.with_limit(#limit)));

        quote! {
            #rt::query::Query::filtered(#filter) #(#orders)* #plan_limit #sorted #paged #limit
        }
    }

    /// Owned value of the parameter playing `role`, if any.
    fn directive(&self, role: &ParamRole) -> Option<TokenStream> {
        let param = self.params.iter().find(|param| param.role == *role)?;
        let name = &param.name;
        Some(match param.ty {
            Type::Reference(_) => quote!(::core::clone::Clone::clone(#name)),
            _ => quote!(#name),
        })
    }

    fn condition(&self, predicate: &Predicate, uses: &HashMap<usize, usize>) -> TokenStream {
        let rt = self.runtime;
        let property = &predicate.property;
        let comparator = format_ident!("{}", predicate.comparator.as_ref());
        let args: Vec<TokenStream> = predicate
            .params
            .iter()
            .filter_map(|&position| {
                let param = self.params.get(position)?;
                Some(self.argument(&param.name, uses.get(&position).copied().unwrap_or(1)))
            })
            .collect();

        let operand = match (predicate.comparator, args.as_slice()) {
            (Comparator::Between, [low, high]) => {
                quote!(#rt::query::Operand::range(#low, #high))
            }
            (comparator, [values]) if comparator.takes_list() => {
                quote!(#rt::query::Operand::list(#values.iter().cloned()))
            }
            (_, [value]) => quote!(#rt::query::Operand::single(#value)),
            _ => quote!(#rt::query::Operand::None),
        };
        let ignore_case = predicate.ignore_case.then(|| quote!(.ignoring_case()));

        quote! {
            #rt::query::Condition::new(
                #property,
                #rt::query::Comparator::#comparator,
                #operand,
            ) #ignore_case
        }
    }

    /// Parameters used more than once are cloned at each use.
    fn argument(&self, name: &Ident, uses: usize) -> TokenStream {
        if uses > 1 {
            quote!(::core::clone::Clone::clone(&#name))
        } else {
            quote!(#name)
        }
    }

    fn param_uses(&self, plan: &QueryPlan) -> HashMap<usize, usize> {
        let mut uses = HashMap::new();
        for position in plan.predicates().flat_map(|p| p.params.iter()) {
            *uses.entry(*position).or_insert(0) += 1;
        }
        uses
    }
}
