//! Assignment versus `Object.defineProperty`, decided against the heap as
//! reconstructed so far.

#[cfg(test)]
mod tests {
    use crate::{
        Attributes, Do, DumpError, Done, Dumper, Heap, MemoryHeap, ObjectId, Selector, Value,
    };

    fn sel(s: &str) -> Selector {
        Selector::parse(s).unwrap()
    }

    fn dump(dumper: &mut Dumper<'_>, selector: &str, todo: Do) -> String {
        let cursor = dumper.global_cursor();
        dumper.dump_binding(&cursor, &sel(selector), todo).unwrap();
        dumper.take_output()
    }

    /// Adds a non-extensible built-in `Locked` to a pristine heap.
    fn with_locked(heap: &mut MemoryHeap) -> ObjectId {
        let locked = heap.new_plain_object();
        heap.prevent_extensions(locked);
        heap.register_builtin("Locked", locked);
        heap.declare_global("Locked", Value::Object(locked));
        locked
    }

    /// Adds a built-in `Config` whose properties are non-configurable.
    fn with_config(heap: &mut MemoryHeap) -> ObjectId {
        let config = heap.new_plain_object();
        let pinned = Attributes::new(true, true, false);
        heap.define(config, "k", Value::from(1.0), pinned);
        heap.define(config, "j", Value::from(2.0), pinned);
        heap.register_builtin("Config", config);
        heap.declare_global("Config", Value::Object(config));
        config
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // INHERITED READ-ONLY
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_read_only_inherited_property_is_defined() {
        let pristine = MemoryHeap::pristine();
        let mut current = MemoryHeap::pristine();
        let parent = current.new_plain_object();
        current.define(parent, "foo", Value::from(1.0), Attributes::NONE);
        let child = current.new_object(Some(parent));
        current.set(child, "foo", Value::from(2.0));
        current.declare_global("parent", Value::Object(parent));
        current.declare_global("child", Value::Object(child));

        let mut dumper = Dumper::new(&pristine, &current).unwrap();
        assert_eq!(
            dump(&mut dumper, "parent", Do::Recurse),
            "var parent = {};\n\
             parent.foo = 1;\n\
             Object.defineProperty(parent, 'foo', {writable: false, enumerable: false, configurable: false});\n"
        );
        assert_eq!(dumper.is_writable(&sel("parent.foo")), Ok(false));

        assert_eq!(
            dump(&mut dumper, "child", Do::Set),
            "var child = Object.create(parent);\n"
        );
        assert_eq!(dumper.is_writable(&sel("child.foo")), Ok(false));
        assert_eq!(dumper.is_writable(&sel("child.other")), Ok(true));

        assert_eq!(
            dump(&mut dumper, "child", Do::Recurse),
            "Object.defineProperty(child, 'foo', {writable: true, enumerable: true, configurable: true, value: 2});\n"
        );
        assert_eq!(dumper.is_writable(&sel("child.foo")), Ok(true));
        assert_eq!(dumper.object_done(&sel("child")), Ok(Done::Recursive));
    }

    #[test]
    fn test_read_only_grandparent_blocks_assignment() {
        let pristine = MemoryHeap::pristine();
        let mut current = MemoryHeap::pristine();
        let top = current.new_plain_object();
        current.define(top, "id", Value::from("top"), Attributes::new(false, true, true));
        let middle = current.new_object(Some(top));
        let bottom = current.new_object(Some(middle));
        current.set(bottom, "id", Value::from("bottom"));
        current.declare_global("top", Value::Object(top));
        current.declare_global("middle", Value::Object(middle));
        current.declare_global("bottom", Value::Object(bottom));

        let mut dumper = Dumper::new(&pristine, &current).unwrap();
        let cursor = dumper.global_cursor();
        dumper.dump(&cursor).unwrap();
        assert_eq!(
            dumper.take_output(),
            "var top = {};\n\
             top.id = 'top';\n\
             Object.defineProperty(top, 'id', {writable: false});\n\
             var middle = Object.create(top);\n\
             var bottom = Object.create(middle);\n\
             Object.defineProperty(bottom, 'id', {writable: true, enumerable: true, configurable: true, value: 'bottom'});\n"
        );
    }

    #[test]
    fn test_own_property_made_read_only_after_assignment() {
        let pristine = MemoryHeap::pristine();
        let mut current = MemoryHeap::pristine();
        let obj = current.new_plain_object();
        current.define(obj, "x", Value::from(1.0), Attributes::new(false, true, true));
        current.declare_global("obj", Value::Object(obj));

        let mut dumper = Dumper::new(&pristine, &current).unwrap();
        assert_eq!(
            dump(&mut dumper, "obj", Do::Recurse),
            "var obj = {};\nobj.x = 1;\nObject.defineProperty(obj, 'x', {writable: false});\n"
        );
    }

    #[test]
    fn test_is_writable_rejects_non_properties() {
        let pristine = MemoryHeap::pristine();
        let current = MemoryHeap::pristine();
        let mut dumper = Dumper::new(&pristine, &current).unwrap();
        assert!(matches!(
            dumper.is_writable(&sel("Object")),
            Err(DumpError::NoSuchBinding { .. })
        ));
        assert!(matches!(
            dumper.is_writable(&sel("nowhere.x")),
            Err(DumpError::NoSuchBinding { .. })
        ));
        assert_eq!(dumper.is_writable(&sel("Object.prototype.anything")), Ok(true));
        assert_eq!(dumper.is_writable(&sel("Array.prototype")), Ok(false));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // UNREPRODUCIBLE CHANGES
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_frozen_builtin_property_cannot_be_replaced() {
        let pristine = MemoryHeap::pristine();
        let mut current = MemoryHeap::pristine();
        let array = current.builtin("Array").unwrap();
        let replacement = current.new_plain_object();
        current.define(array, "prototype", Value::Object(replacement), Attributes::NONE);

        let mut dumper = Dumper::new(&pristine, &current).unwrap();
        let out = dump(&mut dumper, "Array", Do::Recurse);
        assert_eq!(
            out.lines().next(),
            Some("// cannot set Array.prototype: it is read-only and non-configurable")
        );
        assert!(out.lines().all(|line| line.starts_with("// ")));
        assert_eq!(dumper.done_of(&sel("Array.prototype")), Ok(Do::Decl));
        assert_eq!(dumper.object_done(&sel("Array")), Ok(Done::No));
    }

    #[test]
    fn test_non_extensible_builtin_rejects_new_properties() {
        let mut pristine = MemoryHeap::pristine();
        with_locked(&mut pristine);
        let mut current = MemoryHeap::pristine();
        let locked = with_locked(&mut current);
        current.set(locked, "late", Value::from(1.0));

        let mut dumper = Dumper::new(&pristine, &current).unwrap();
        let out = dump(&mut dumper, "Locked", Do::Recurse);
        assert_eq!(
            out.lines().next(),
            Some("// cannot set Locked.late: the object is not extensible")
        );
        assert_eq!(dumper.done_of(&sel("Locked.late")), Ok(Do::Unstarted));
        assert_eq!(dumper.is_writable(&sel("Locked.late")), Ok(true));
    }

    #[test]
    fn test_non_extensible_builtin_keeps_its_prototype() {
        let mut pristine = MemoryHeap::pristine();
        with_locked(&mut pristine);
        let mut current = MemoryHeap::pristine();
        let locked = with_locked(&mut current);
        current.set_prototype(locked, None);

        let mut dumper = Dumper::new(&pristine, &current).unwrap();
        let out = dump(&mut dumper, "Locked", Do::Recurse);
        assert_eq!(
            out.lines().next(),
            Some("// cannot change the prototype of non-extensible Locked")
        );
        assert_eq!(dumper.done_of(&sel("Locked{proto}")), Ok(Do::Decl));
    }

    #[test]
    fn test_non_configurable_attributes() {
        let mut pristine = MemoryHeap::pristine();
        with_config(&mut pristine);
        let mut current = MemoryHeap::pristine();
        let config = with_config(&mut current);
        current.define(config, "k", Value::from(1.0), Attributes::new(false, true, false));
        current.define(config, "j", Value::from(2.0), Attributes::new(true, false, false));

        let mut dumper = Dumper::new(&pristine, &current).unwrap();
        assert_eq!(dumper.done_of(&sel("Config.k")), Ok(Do::Set));
        let out = dump(&mut dumper, "Config", Do::Recurse);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Object.defineProperty(Config, 'k', {writable: false});");
        assert_eq!(
            lines[1],
            "// cannot change attributes of non-configurable Config.j"
        );
        assert_eq!(dumper.done_of(&sel("Config.k")), Ok(Do::Recurse));
        assert_eq!(dumper.done_of(&sel("Config.j")), Ok(Do::Set));
        assert_eq!(dumper.is_writable(&sel("Config.k")), Ok(false));
    }
}
