use anyhow::Result;
use memoref_plan::{PlanArena, PlanDescription, PlanGraph, QuantifierKind, RefId};
use memoref_traversal::{
    render_dot, render_dot_with, RefTraversal, TraversableRef, TraversalConfig, TraversalError,
};

fn refs_of(views: &[TraversableRef<'_, PlanArena>]) -> Vec<RefId> {
    let mut out: Vec<RefId> = views.iter().map(|v| v.reference()).collect();
    out.sort();
    out
}

#[test]
fn filter_over_scan_has_one_parent_link() -> Result<()> {
    // R1 { Ea(q -> R2) }, R2 { Eb() }
    let mut plan = PlanArena::new();
    let r1 = plan.add_ref();
    let r2 = plan.add_ref();
    let ea = plan.add_expr(r1, "Filter")?;
    let q = plan.add_quantifier(ea, "q", QuantifierKind::ForEach, r2)?;
    plan.add_expr(r2, "Scan")?;

    let traversal = RefTraversal::with_root(&plan, r1)?;

    let mut nodes: Vec<RefId> = traversal.refs().collect();
    nodes.sort();
    assert_eq!(nodes, vec![r1, r2]);

    let paths: Vec<_> = traversal.ref_paths().collect();
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].child, r2);
    assert_eq!(paths[0].parent, r1);
    assert_eq!(paths[0].path.expression(), ea);
    assert_eq!(paths[0].path.quantifier(), q);

    assert_eq!(refs_of(&traversal.from(r2)?.parent_refs()), vec![r1]);
    assert!(traversal.from(r1)?.parent_refs().is_empty());
    assert!(traversal.root().parent_refs().is_empty());
    assert_eq!(refs_of(&traversal.leaves()), vec![r2]);
    Ok(())
}

#[test]
fn parallel_quantifiers_dedupe_parent() -> Result<()> {
    // R1 { Ea(q1 -> R2, q2 -> R2) }
    let mut plan = PlanArena::new();
    let r1 = plan.add_ref();
    let r2 = plan.add_ref();
    let ea = plan.add_expr(r1, "Join")?;
    let q1 = plan.add_quantifier(ea, "l", QuantifierKind::ForEach, r2)?;
    let q2 = plan.add_quantifier(ea, "r", QuantifierKind::ForEach, r2)?;
    plan.add_expr(r2, "Scan")?;

    let traversal = RefTraversal::with_root(&plan, r1)?;
    assert_eq!(traversal.path_count(), 2);

    let child = traversal.from(r2)?;
    assert_eq!(refs_of(&child.parent_refs()), vec![r1]);

    let paths = child.parent_paths();
    assert_eq!(paths.len(), 2);
    let mut quantifiers: Vec<_> = paths.iter().map(|(_, path)| path.quantifier()).collect();
    quantifiers.sort();
    assert_eq!(quantifiers, vec![q1, q2]);
    assert!(paths.iter().all(|(parent, path)| {
        parent.reference() == r1 && path.expression() == ea
    }));

    assert_eq!(refs_of(&traversal.root().child_refs()), vec![r2]);
    Ok(())
}

#[test]
fn parallel_quantifiers_across_variants_dedupe_parent() -> Result<()> {
    let mut plan = PlanArena::new();
    let top = plan.add_ref();
    let child = plan.add_ref();
    let hash_join = plan.add_expr(top, "HashJoin")?;
    let merge_join = plan.add_expr(top, "MergeJoin")?;
    plan.add_quantifier(hash_join, "c", QuantifierKind::ForEach, child)?;
    plan.add_quantifier(merge_join, "c", QuantifierKind::Physical, child)?;

    let traversal = RefTraversal::with_root(&plan, top)?;
    let view = traversal.from(child)?;
    assert_eq!(refs_of(&view.parent_refs()), vec![top]);
    let mut expressions: Vec<_> = view
        .parent_paths()
        .iter()
        .map(|(_, path)| path.expression())
        .collect();
    expressions.sort();
    assert_eq!(expressions, vec![hash_join, merge_join]);
    Ok(())
}

#[test]
fn self_consuming_reference_is_its_own_parent() -> Result<()> {
    let mut plan = PlanArena::new();
    let base = plan.add_ref();
    let x = plan.add_ref();
    let union = plan.add_expr(x, "RecursiveUnion")?;
    plan.add_quantifier(union, "base", QuantifierKind::ForEach, base)?;
    plan.add_quantifier(union, "step", QuantifierKind::ForEach, x)?;
    plan.add_expr(base, "Scan")?;

    let traversal = RefTraversal::with_root(&plan, x)?;
    assert_eq!(traversal.ref_count(), 2);
    assert!(traversal
        .ref_paths()
        .any(|edge| edge.child == x && edge.parent == x));

    let view = traversal.from(x)?;
    assert_eq!(refs_of(&view.parent_refs()), vec![x]);
    assert!(!view.is_leaf());
    assert_eq!(refs_of(&view.ancestors()), vec![x]);
    assert!(view.is_ancestor_of(&view));
    assert_eq!(refs_of(&traversal.leaves()), vec![base]);
    Ok(())
}

#[test]
fn diamond_shares_one_node() -> Result<()> {
    // top -> {left, right} -> shared
    let mut plan = PlanArena::new();
    let top = plan.add_ref();
    let left = plan.add_ref();
    let right = plan.add_ref();
    let shared = plan.add_ref();
    let join = plan.add_expr(top, "Join")?;
    plan.add_quantifier(join, "l", QuantifierKind::ForEach, left)?;
    plan.add_quantifier(join, "r", QuantifierKind::ForEach, right)?;
    let l = plan.add_expr(left, "Filter")?;
    plan.add_quantifier(l, "s", QuantifierKind::ForEach, shared)?;
    let r = plan.add_expr(right, "Map")?;
    plan.add_quantifier(r, "s", QuantifierKind::ForEach, shared)?;
    plan.add_expr(shared, "Scan")?;

    let traversal = RefTraversal::with_root(&plan, top)?;
    assert_eq!(traversal.ref_count(), 4);
    assert_eq!(traversal.path_count(), 4);

    let shared_view = traversal.from(shared)?;
    assert_eq!(refs_of(&shared_view.parent_refs()), vec![left, right]);
    assert_eq!(refs_of(&shared_view.ancestors()), vec![top, left, right]);
    assert!(traversal.root().is_ancestor_of(&shared_view));
    assert!(!shared_view.is_ancestor_of(&traversal.root()));
    assert!(!traversal.from(left)?.is_ancestor_of(&traversal.from(right)?));
    assert_eq!(refs_of(&traversal.leaves()), vec![shared]);
    Ok(())
}

#[test]
fn ancestors_are_breadth_first() -> Result<()> {
    // a <- b <- c <- d (d is the root)
    let mut plan = PlanArena::new();
    let a = plan.add_ref();
    let b = plan.add_ref();
    let c = plan.add_ref();
    let d = plan.add_ref();
    plan.add_expr(a, "Scan")?;
    for (parent, child) in [(b, a), (c, b), (d, c)] {
        let e = plan.add_expr(parent, "Map")?;
        plan.add_quantifier(e, "in", QuantifierKind::ForEach, child)?;
    }

    let traversal = RefTraversal::with_root(&plan, d)?;
    let ancestors: Vec<RefId> = traversal
        .from(a)?
        .ancestors()
        .iter()
        .map(|v| v.reference())
        .collect();
    assert_eq!(ancestors, vec![b, c, d]);
    assert!(traversal.root().ancestors().is_empty());
    assert!(traversal.root().is_root());
    assert!(!traversal.from(a)?.is_root());
    Ok(())
}

#[test]
fn root_consumed_inside_its_own_snapshot_has_parents() -> Result<()> {
    let mut plan = PlanArena::new();
    let r1 = plan.add_ref();
    let r2 = plan.add_ref();
    let e1 = plan.add_expr(r1, "Map")?;
    plan.add_quantifier(e1, "x", QuantifierKind::ForEach, r2)?;
    let e2 = plan.add_expr(r2, "Map")?;
    plan.add_quantifier(e2, "y", QuantifierKind::Existential, r1)?;

    let traversal = RefTraversal::with_root(&plan, r1)?;
    assert_eq!(refs_of(&traversal.root().parent_refs()), vec![r2]);
    assert_eq!(refs_of(&traversal.root().ancestors()), vec![r1, r2]);
    assert!(traversal.leaves().is_empty());
    Ok(())
}

#[test]
fn unreachable_reference_is_rejected() -> Result<()> {
    let mut plan = PlanArena::new();
    let root = plan.add_ref();
    let stray = plan.add_ref();
    plan.add_expr(root, "Scan")?;
    plan.add_expr(stray, "Scan")?;

    let traversal = RefTraversal::with_root(&plan, root)?;
    assert!(!traversal.contains(stray));

    let err = traversal.from(stray).unwrap_err();
    assert_eq!(
        err,
        TraversalError::UnknownReference {
            reference: format!("{stray:?}"),
            root: format!("{root:?}"),
        }
    );
    Ok(())
}

#[test]
fn unbound_quantifier_aborts_build() -> Result<()> {
    let mut plan = PlanArena::new();
    let top = plan.add_ref();
    let child = plan.add_ref();
    let e = plan.add_expr(top, "Join")?;
    plan.add_quantifier(e, "ok", QuantifierKind::ForEach, child)?;
    let dangling = plan.add_unbound_quantifier(e, "dangling", QuantifierKind::ForEach)?;

    let err = RefTraversal::with_root(&plan, top).unwrap_err();
    match &err {
        TraversalError::MalformedPlanGraph { detail } => {
            assert!(detail.contains(&format!("{dangling:?}")));
        }
        other => panic!("expected MalformedPlanGraph, got {other:?}"),
    }

    plan.bind(dangling, child)?;
    let traversal = RefTraversal::with_root(&plan, top)?;
    assert_eq!(traversal.from(child)?.parent_paths().len(), 2);
    Ok(())
}

#[test]
fn mutation_after_build_is_detected() -> Result<()> {
    let mut plan = PlanArena::new();
    let top = plan.add_ref();
    plan.add_expr(top, "Scan")?;

    let traversal = RefTraversal::with_root(&plan, top)?;
    assert_eq!(traversal.generation(), plan.generation());
    traversal.ensure_fresh(&plan)?;

    plan.add_expr(top, "IndexScan")?;
    let err = traversal.ensure_fresh(&plan).unwrap_err();
    assert!(matches!(err, TraversalError::StaleSnapshot { .. }));

    let mut other = PlanArena::new();
    let other_top = other.add_ref();
    other.add_expr(other_top, "Scan")?;
    assert!(traversal.ensure_fresh(&other).is_err());

    let rebuilt = RefTraversal::with_root(&plan, top)?;
    rebuilt.ensure_fresh(&plan)?;
    Ok(())
}

#[test]
fn deep_chain_builds_without_recursion() -> Result<()> {
    const DEPTH: usize = 100_000;

    let mut plan = PlanArena::new();
    let refs: Vec<RefId> = (0..DEPTH).map(|_| plan.add_ref()).collect();
    for pair in refs.windows(2) {
        let e = plan.add_expr(pair[0], "Map")?;
        plan.add_quantifier(e, "in", QuantifierKind::ForEach, pair[1])?;
    }
    plan.add_expr(refs[DEPTH - 1], "Scan")?;

    let config = TraversalConfig::sized_for(plan.ref_count(), plan.quantifier_count());
    let traversal = RefTraversal::with_root_config(&plan, refs[0], &config)?;
    assert_eq!(traversal.ref_count(), DEPTH);
    assert_eq!(traversal.path_count(), DEPTH - 1);
    assert_eq!(refs_of(&traversal.leaves()), vec![refs[DEPTH - 1]]);
    assert_eq!(traversal.from(refs[DEPTH - 1])?.ancestors().len(), DEPTH - 1);
    Ok(())
}

#[test]
fn snapshot_is_shareable_across_threads() -> Result<()> {
    let mut plan = PlanArena::new();
    let top = plan.add_ref();
    let kids: Vec<RefId> = (0..8).map(|_| plan.add_ref()).collect();
    let union = plan.add_expr(top, "Union")?;
    for (i, &kid) in kids.iter().enumerate() {
        plan.add_quantifier(union, format!("k{i}"), QuantifierKind::ForEach, kid)?;
        plan.add_expr(kid, "Scan")?;
    }

    let traversal = RefTraversal::with_root(&plan, top)?;
    std::thread::scope(|scope| {
        for &kid in &kids {
            let traversal = &traversal;
            scope.spawn(move || {
                let view = traversal.from(kid).expect("kid is reachable");
                assert_eq!(view.parent_refs().len(), 1);
                assert!(view.is_leaf());
            });
        }
    });
    assert_eq!(traversal.leaves().len(), kids.len());
    Ok(())
}

#[test]
fn traversal_over_json_description() -> Result<()> {
    let text = r#"
    {
      "root": "project",
      "refs": [
        { "name": "project", "members": [
            { "operator": "Project", "quantifiers": [ { "alias": "f", "over": "filter" } ] } ] },
        { "name": "filter", "members": [
            { "operator": "Filter", "quantifiers": [ { "alias": "s", "over": "scan" } ] },
            { "operator": "IndexScan" } ] },
        { "name": "scan", "members": [ { "operator": "Scan" } ] }
      ]
    }"#;
    let built = PlanDescription::from_json(text)?.build()?;
    let traversal = RefTraversal::with_root(&built.arena, built.root)?;

    let scan = built.ref_id("scan").expect("scan declared");
    let filter = built.ref_id("filter").expect("filter declared");
    assert_eq!(refs_of(&traversal.from(scan)?.parent_refs()), vec![filter]);
    // `filter` has a leaf-producing variant, but another variant still consumes `scan`.
    assert!(!traversal.from(filter)?.is_leaf());
    assert_eq!(refs_of(&traversal.leaves()), vec![scan]);
    Ok(())
}

#[test]
fn dot_render_marks_root_and_leaves() -> Result<()> {
    let built = PlanDescription::from_json(
        r#"{ "root": "top", "refs": [
            { "name": "top", "members": [ { "operator": "Filter",
                "quantifiers": [ { "alias": "s", "over": "scan" } ] } ] },
            { "name": "scan", "members": [ { "operator": "Scan" } ] } ] }"#,
    )?
    .build()?;
    let traversal = RefTraversal::with_root(&built.arena, built.root)?;

    let dot = render_dot(&traversal);
    assert!(dot.starts_with("digraph memoref {"));
    assert!(dot.contains("n0 [label=\"RefId(0)\", peripheries=2];"));
    assert!(dot.contains("fillcolor=\"#eeeeee\""));
    assert!(dot.contains("n1 -> n0 [label=\"ExprId(0) / QuantifierId(0)\"];"));

    let named = render_dot_with(&traversal, |r| {
        built.name_of(r).unwrap_or("?").to_string()
    });
    assert!(named.contains("label=\"top\""));
    assert!(named.contains("label=\"scan\""));
    Ok(())
}

/// A plan that does not track mutations, addressed by plain indices.
struct StaticPlan {
    members: Vec<Vec<usize>>,
    quantifiers: Vec<Vec<usize>>,
    ranges_over: Vec<Option<usize>>,
}

impl PlanGraph for StaticPlan {
    type Ref = usize;
    type Expr = usize;
    type Quantifier = usize;

    fn members(&self, reference: usize) -> Option<&[usize]> {
        self.members.get(reference).map(Vec::as_slice)
    }

    fn quantifiers(&self, expression: usize) -> Option<&[usize]> {
        self.quantifiers.get(expression).map(Vec::as_slice)
    }

    fn ranges_over(&self, quantifier: usize) -> Option<usize> {
        self.ranges_over.get(quantifier).copied().flatten()
    }
}

#[test]
fn custom_plan_without_generations() -> Result<()> {
    // ref 0 { expr 0 (q0 -> ref 1) }, ref 1 { expr 1 }
    let plan = StaticPlan {
        members: vec![vec![0], vec![1]],
        quantifiers: vec![vec![0], vec![]],
        ranges_over: vec![Some(1)],
    };

    let traversal = RefTraversal::with_root(&plan, 0)?;
    assert_eq!(traversal.generation(), None);
    traversal.ensure_fresh(&plan)?;

    let parents: Vec<usize> = traversal
        .from(1)?
        .parent_refs()
        .iter()
        .map(|v| v.reference())
        .collect();
    assert_eq!(parents, vec![0]);

    let broken = StaticPlan {
        members: vec![vec![0]],
        quantifiers: vec![vec![0]],
        ranges_over: vec![Some(7)],
    };
    let err = RefTraversal::with_root(&broken, 0).unwrap_err();
    assert!(err.to_string().contains("reference 7 is not known"));
    Ok(())
}
