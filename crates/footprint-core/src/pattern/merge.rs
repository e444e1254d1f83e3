use super::node::PatternNode;

/// Merge two sibling slices that spell the same leaf sequence into one
/// repeated node.
///
/// Returns `None` when the slices differ in first leaf, leaf count or
/// signature, or when their group boundaries cross so that no common shape
/// exists. A result that is already a single group is returned as-is;
/// anything else becomes the children of a new repetition.
pub fn merge(src: &[PatternNode], dest: &[PatternNode]) -> Option<PatternNode> {
    let (first_src, first_dest) = (src.first()?, dest.first()?);
    if first_src.first_leaf() != first_dest.first_leaf() {
        return None;
    }
    if leaves(src) != leaves(dest) {
        return None;
    }
    if signature(src) != signature(dest) {
        return None;
    }

    let mut combined = combine(src, dest)?;
    if combined.len() == 1 && !combined[0].is_leaf() {
        return combined.pop();
    }
    Some(PatternNode::group(combined))
}

fn leaves(nodes: &[PatternNode]) -> usize {
    nodes.iter().map(PatternNode::leaves).sum()
}

fn signature(nodes: &[PatternNode]) -> Vec<&str> {
    let mut out = Vec::with_capacity(leaves(nodes));
    for node in nodes {
        node.collect_leaves(&mut out);
    }
    out
}

/// Structurally unify two slices with identical signatures
fn combine(src: &[PatternNode], dest: &[PatternNode]) -> Option<Vec<PatternNode>> {
    match (src, dest) {
        ([a], [b]) if a.is_leaf() && b.is_leaf() => {
            (a.value() == b.value()).then(|| vec![a.clone()])
        }
        ([a], [b]) if !a.is_leaf() && !b.is_leaf() => {
            Some(vec![PatternNode::group(combine(a.children(), b.children())?)])
        }
        ([a], _) if !a.is_leaf() => Some(vec![PatternNode::group(combine(a.children(), dest)?)]),
        (_, [b]) if !b.is_leaf() => Some(vec![PatternNode::group(combine(src, b.children())?)]),
        _ => split(src, dest),
    }
}

/// Unify at the first boundary where both sides hold the same number of
/// leaves, then unify the remainders.
fn split(src: &[PatternNode], dest: &[PatternNode]) -> Option<Vec<PatternNode>> {
    let (mut i, mut j) = (1, 1);
    let (mut src_leaves, mut dest_leaves) = (src.first()?.leaves(), dest.first()?.leaves());

    while src_leaves != dest_leaves {
        if src_leaves < dest_leaves {
            src_leaves += src.get(i)?.leaves();
            i += 1;
        } else {
            dest_leaves += dest.get(j)?.leaves();
            j += 1;
        }
    }

    // The only shared boundary is the end: the two groupings cross.
    if i == src.len() && j == dest.len() {
        return None;
    }

    let mut out = combine(&src[..i], &dest[..j])?;
    out.extend(combine(&src[i..], &dest[j..])?);
    Some(out)
}
