//! Recursive dumps over cyclic and deep object graphs.

#[cfg(test)]
mod tests {
    use crate::{Do, Done, Dumper, MemoryHeap, ObjectId, Selector, Value};

    fn sel(s: &str) -> Selector {
        Selector::parse(s).unwrap()
    }

    fn dump(dumper: &mut Dumper<'_>, selector: &str, todo: Do) -> String {
        let cursor = dumper.global_cursor();
        dumper.dump_binding(&cursor, &sel(selector), todo).unwrap();
        dumper.take_output()
    }

    fn link(heap: &mut MemoryHeap, from: ObjectId, key: &str, to: ObjectId) {
        heap.set(from, key, Value::Object(to));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // CYCLES
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_mutual_references_complete_together() {
        let pristine = MemoryHeap::pristine();
        let mut current = MemoryHeap::pristine();
        let a = current.new_plain_object();
        let b = current.new_plain_object();
        link(&mut current, a, "b", b);
        link(&mut current, b, "a", a);
        current.declare_global("a", Value::Object(a));

        let mut dumper = Dumper::new(&pristine, &current).unwrap();
        assert_eq!(
            dump(&mut dumper, "a", Do::Recurse),
            "var a = {};\na.b = {};\na.b.a = a;\n"
        );
        assert_eq!(dumper.done_of(&sel("a")), Ok(Do::Recurse));
        assert_eq!(dumper.done_of(&sel("a.b")), Ok(Do::Recurse));
        assert_eq!(dumper.done_of(&sel("a.b.a")), Ok(Do::Recurse));
        assert_eq!(dumper.object_done(&sel("a")), Ok(Done::Recursive));
        assert_eq!(dumper.object_done(&sel("a.b")), Ok(Done::Recursive));
    }

    #[test]
    fn test_mutual_globals_complete_without_tree_only() {
        let pristine = MemoryHeap::pristine();
        let mut current = MemoryHeap::pristine();
        let a = current.new_plain_object();
        let b = current.new_plain_object();
        link(&mut current, a, "b", b);
        link(&mut current, b, "a", a);
        current.declare_global("a", Value::Object(a));
        current.declare_global("b", Value::Object(b));

        let mut dumper = Dumper::new(&pristine, &current).unwrap();
        dumper.set_options_json(r#"{"treeOnly": false}"#).unwrap();
        assert_eq!(
            dump(&mut dumper, "a", Do::Recurse),
            "var a = {};\na.b = {};\na.b.a = a;\n"
        );
        assert_eq!(dumper.object_done(&sel("b")), Ok(Done::Recursive));

        // b already exists; its variable just needs a name for it.
        assert_eq!(dump(&mut dumper, "b", Do::Recurse), "var b = a.b;\n");
        assert_eq!(dumper.done_of(&sel("b")), Ok(Do::Recurse));
    }

    #[test]
    fn test_self_reference() {
        let pristine = MemoryHeap::pristine();
        let mut current = MemoryHeap::pristine();
        let s = current.new_plain_object();
        link(&mut current, s, "self", s);
        current.declare_global("s", Value::Object(s));

        let mut dumper = Dumper::new(&pristine, &current).unwrap();
        assert_eq!(
            dump(&mut dumper, "s", Do::Recurse),
            "var s = {};\ns.self = s;\n"
        );
        assert_eq!(dumper.done_of(&sel("s.self")), Ok(Do::Recurse));
        assert_eq!(dumper.object_done(&sel("s")), Ok(Done::Recursive));
    }

    #[test]
    fn test_ring_of_three() {
        let pristine = MemoryHeap::pristine();
        let mut current = MemoryHeap::pristine();
        let x = current.new_plain_object();
        let y = current.new_plain_object();
        let z = current.new_plain_object();
        link(&mut current, x, "next", y);
        link(&mut current, y, "next", z);
        link(&mut current, z, "next", x);
        current.declare_global("x", Value::Object(x));

        let mut dumper = Dumper::new(&pristine, &current).unwrap();
        assert_eq!(
            dump(&mut dumper, "x", Do::Recurse),
            "var x = {};\n\
             x.next = {};\n\
             x.next.next = {};\n\
             x.next.next.next = x;\n"
        );
        for member in ["x", "x.next", "x.next.next"] {
            assert_eq!(dumper.object_done(&sel(member)), Ok(Done::Recursive), "{}", member);
        }
        assert_eq!(dumper.done_of(&sel("x.next.next.next")), Ok(Do::Recurse));
    }

    #[test]
    fn test_sibling_cycles_merge_at_their_common_ancestor() {
        let pristine = MemoryHeap::pristine();
        let mut current = MemoryHeap::pristine();
        let root = current.new_plain_object();
        let left = current.new_plain_object();
        let right = current.new_plain_object();
        link(&mut current, root, "left", left);
        link(&mut current, root, "right", right);
        link(&mut current, left, "back", root);
        link(&mut current, right, "back", root);
        current.declare_global("r", Value::Object(root));

        let mut dumper = Dumper::new(&pristine, &current).unwrap();
        assert_eq!(
            dump(&mut dumper, "r", Do::Recurse),
            "var r = {};\n\
             r.left = {};\n\
             r.left.back = r;\n\
             r.right = {};\n\
             r.right.back = r;\n"
        );
        assert_eq!(dumper.object_done(&sel("r.left")), Ok(Done::Recursive));
        assert_eq!(dumper.object_done(&sel("r.right")), Ok(Done::Recursive));
        assert_eq!(dumper.done_of(&sel("r.right.back")), Ok(Do::Recurse));
    }

    #[test]
    fn test_second_path_to_waiting_object() {
        let pristine = MemoryHeap::pristine();
        let mut current = MemoryHeap::pristine();
        let root = current.new_plain_object();
        let child = current.new_plain_object();
        link(&mut current, root, "a", child);
        link(&mut current, child, "back", root);
        link(&mut current, root, "b", child);
        current.declare_global("r", Value::Object(root));

        let mut dumper = Dumper::new(&pristine, &current).unwrap();
        assert_eq!(
            dump(&mut dumper, "r", Do::Recurse),
            "var r = {};\nr.a = {};\nr.a.back = r;\nr.b = r.a;\n"
        );
        assert_eq!(dumper.done_of(&sel("r.b")), Ok(Do::Recurse));
        assert_eq!(dumper.object_done(&sel("r")), Ok(Done::Recursive));
    }

    #[test]
    fn test_tree_only_defers_non_preferred_paths() {
        let pristine = MemoryHeap::pristine();
        let mut current = MemoryHeap::pristine();
        let holder = current.new_plain_object();
        let shared = current.new_plain_object();
        current.set(shared, "v", Value::from(1.0));
        link(&mut current, holder, "shared", shared);
        current.declare_global("holder", Value::Object(holder));
        current.declare_global("shared", Value::Object(shared));

        let mut dumper = Dumper::new(&pristine, &current).unwrap();
        assert_eq!(
            dumper.preferred_ref(&sel("holder.shared")),
            Ok(Some(sel("shared")))
        );
        assert_eq!(
            dump(&mut dumper, "holder", Do::Recurse),
            "var holder = {};\nholder.shared = {};\n"
        );
        assert_eq!(dumper.done_of(&sel("holder")), Ok(Do::DONE));
        assert_eq!(dumper.done_of(&sel("holder.shared")), Ok(Do::DONE));
        assert_eq!(dumper.done_of(&sel("shared.v")), Ok(Do::Unstarted));
        assert_eq!(dumper.object_done(&sel("holder")), Ok(Done::Done));

        // The preferred path finishes the object.
        assert_eq!(
            dump(&mut dumper, "shared", Do::Recurse),
            "var shared = holder.shared;\nshared.v = 1;\n"
        );
        assert_eq!(dumper.object_done(&sel("shared")), Ok(Done::Recursive));
        assert_eq!(dump(&mut dumper, "holder", Do::Recurse), "");
        assert_eq!(dumper.done_of(&sel("holder.shared")), Ok(Do::Recurse));
        assert_eq!(dumper.object_done(&sel("holder")), Ok(Done::Recursive));
    }

    #[test]
    fn test_without_tree_only_any_path_recurses() {
        let pristine = MemoryHeap::pristine();
        let mut current = MemoryHeap::pristine();
        let holder = current.new_plain_object();
        let shared = current.new_plain_object();
        current.set(shared, "v", Value::from(1.0));
        link(&mut current, holder, "shared", shared);
        current.declare_global("holder", Value::Object(holder));
        current.declare_global("shared", Value::Object(shared));

        let mut dumper = Dumper::new(&pristine, &current).unwrap();
        dumper.set_options_json(r#"{"treeOnly": false}"#).unwrap();
        assert_eq!(
            dump(&mut dumper, "holder", Do::Recurse),
            "var holder = {};\nholder.shared = {};\nholder.shared.v = 1;\n"
        );
        assert_eq!(dumper.done_of(&sel("holder.shared")), Ok(Do::Recurse));
    }

    #[test]
    fn test_incomplete_cycle_stays_capped() {
        let pristine = MemoryHeap::pristine();
        let mut current = MemoryHeap::pristine();
        let a = current.new_plain_object();
        let b = current.new_plain_object();
        let native = current.new_native("opaque", 0);
        link(&mut current, a, "b", b);
        link(&mut current, b, "a", a);
        link(&mut current, b, "fn", native);
        current.declare_global("a", Value::Object(a));

        let mut dumper = Dumper::new(&pristine, &current).unwrap();
        let out = dump(&mut dumper, "a", Do::Recurse);
        assert!(out.starts_with("var a = {};\na.b = {};\na.b.a = a;\n// cannot rebuild native function object#"));
        assert_eq!(dumper.object_done(&sel("a")), Ok(Done::Done));
        assert_eq!(dumper.object_done(&sel("a.b")), Ok(Done::No));
        assert_eq!(dumper.done_of(&sel("a")), Ok(Do::DONE));
        assert_eq!(dumper.done_of(&sel("a.b")), Ok(Do::DONE));
        assert_eq!(dumper.done_of(&sel("a.b.a")), Ok(Do::DONE));
        assert_eq!(dumper.done_of(&sel("a.b.fn")), Ok(Do::Unstarted));

        // A later request retries, but has nothing new to say.
        let again = dump(&mut dumper, "a", Do::Recurse);
        assert!(!again.is_empty());
        assert!(again.lines().all(|line| line.starts_with("// ")));
        assert_eq!(dumper.done_of(&sel("a")), Ok(Do::DONE));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // DEPTH
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_deep_chain() {
        const LINKS: usize = 200;
        let pristine = MemoryHeap::pristine();
        let mut current = MemoryHeap::pristine();
        let head = current.new_plain_object();
        let mut tail = head;
        for _ in 1..LINKS {
            let next = current.new_plain_object();
            link(&mut current, tail, "next", next);
            tail = next;
        }
        current.set(tail, "value", Value::from(1.0));
        current.declare_global("head", Value::Object(head));

        let mut dumper = Dumper::new(&pristine, &current).unwrap();
        let out = dump(&mut dumper, "head", Do::Recurse);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), LINKS + 1);
        assert_eq!(lines[0], "var head = {};");
        let last = format!("head{} = 1;", ".next".repeat(LINKS - 1) + ".value");
        assert_eq!(lines[LINKS], last);
        assert_eq!(dumper.object_done(&sel("head")), Ok(Done::Recursive));
    }

    #[test]
    fn test_deep_cycle() {
        const LINKS: usize = 150;
        let pristine = MemoryHeap::pristine();
        let mut current = MemoryHeap::pristine();
        let head = current.new_plain_object();
        let mut tail = head;
        for _ in 1..LINKS {
            let next = current.new_plain_object();
            link(&mut current, tail, "next", next);
            tail = next;
        }
        link(&mut current, tail, "next", head);
        current.declare_global("head", Value::Object(head));

        let mut dumper = Dumper::new(&pristine, &current).unwrap();
        let out = dump(&mut dumper, "head", Do::Recurse);
        let last = format!("head{} = head;", ".next".repeat(LINKS));
        assert_eq!(out.lines().last(), Some(last.as_str()));
        assert_eq!(dumper.object_done(&sel("head")), Ok(Done::Recursive));
        assert_eq!(dumper.done_of(&sel("head")), Ok(Do::Recurse));
    }
}
