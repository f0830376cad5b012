//! Scene fixtures
//!
//! Each fixture is a small program written against `SceneBuilder` /
//! `MethodBuilder`. Comments show the source the IR stands for.

use codegraph_pta::shared::models::{
    FieldSignature, Local, MethodBuilder, MethodSignature, Scene, SceneBuilder, Stmt, Type, Value,
};

pub fn sig(text: &str) -> MethodSignature {
    MethodSignature::parse(text).expect("signature must be Class.method")
}

/// ```text
/// let x = new A(); let y = x; y.f = new B(); let z = x.f;
/// ```
pub fn xyz_scene() -> Scene {
    let main = MethodBuilder::static_fn("Main", "main")
        .new_obj("x", "A")
        .assign("y", "x")
        .new_obj("t", "B")
        .store("y", "f", "t")
        .load("z", "x", "f")
        .ret_void()
        .build();
    SceneBuilder::new()
        .class("Main", None)
        .class("A", None)
        .class("B", None)
        .field("A", "f")
        .method(main)
        .build()
}

/// ```text
/// o1 = new A(); o2 = new A(); a = new B(); b = new C();
/// o1.f = a; o2.f = b; x = o1.f; y = o2.f;
/// ```
pub fn field_scene() -> Scene {
    let main = MethodBuilder::static_fn("Main", "main")
        .new_obj("o1", "A")
        .new_obj("o2", "A")
        .new_obj("a", "B")
        .new_obj("b", "C")
        .store("o1", "f", "a")
        .store("o2", "f", "b")
        .load("x", "o1", "f")
        .load("y", "o2", "f")
        .ret_void()
        .build();
    SceneBuilder::new()
        .class("Main", None)
        .class("A", None)
        .class("B", None)
        .class("C", None)
        .field("A", "f")
        .method(main)
        .build()
}

/// ```text
/// class Animal { speak() { return new Noise(); } }
/// class Dog extends Animal { speak() { return new Bark(); } }
/// class Poodle extends Dog {}
///
/// let x: Animal = new Poodle(); let s = x.speak();
/// ```
pub fn animal_scene() -> Scene {
    let animal_speak = MethodBuilder::instance("Animal", "speak")
        .returns(Type::class("Noise"))
        .new_obj("n", "Noise")
        .ret("n")
        .build();
    let dog_speak = MethodBuilder::instance("Dog", "speak")
        .returns(Type::class("Noise"))
        .new_obj("b", "Bark")
        .ret("b")
        .build();
    let main = MethodBuilder::static_fn("Main", "main")
        .local("x", Type::class("Animal"))
        .new_obj("x", "Poodle")
        .call_virtual(Some("s"), "x", "speak", &[])
        .ret_void()
        .build();
    SceneBuilder::new()
        .class("Main", None)
        .class("Noise", None)
        .class("Bark", Some("Noise"))
        .class("Animal", None)
        .class("Dog", Some("Animal"))
        .class("Poodle", Some("Dog"))
        .method(animal_speak)
        .method(dog_speak)
        .method(main)
        .build()
}

/// ```text
/// function id(p) { return p; }
/// let a = new A(); let b = new A();
/// let r1 = id(a); let r2 = id(b);
/// ```
pub fn identity_scene() -> Scene {
    let id = MethodBuilder::static_fn("Main", "id")
        .param(0, "p")
        .ret("p")
        .build();
    let main = MethodBuilder::static_fn("Main", "main")
        .new_obj("a", "A")
        .new_obj("b", "A")
        .call_static(Some("r1"), sig("Main.id"), &["a"])
        .call_static(Some("r2"), sig("Main.id"), &["b"])
        .ret_void()
        .build();
    SceneBuilder::new()
        .class("Main", None)
        .class("A", None)
        .method(id)
        .method(main)
        .build()
}

/// The `Task` object only exists after `Factory.make` is resolved
/// dynamically, and `t.run()` can only be resolved after that.
///
/// ```text
/// class Factory { make() { return new Task(); } }
/// class Task { run() { return new Output(); } }
///
/// let f = new Factory(); let t = f.make(); let out = t.run();
/// ```
pub fn factory_scene() -> Scene {
    let make = MethodBuilder::instance("Factory", "make")
        .returns(Type::class("Task"))
        .new_obj("t", "Task")
        .ret("t")
        .build();
    let run = MethodBuilder::instance("Task", "run")
        .returns(Type::class("Output"))
        .new_obj("o", "Output")
        .ret("o")
        .build();
    let main = MethodBuilder::static_fn("Main", "main")
        .new_obj("f", "Factory")
        .local("t", Type::class("Task"))
        .call_virtual(Some("t"), "f", "make", &[])
        .call_virtual(Some("out"), "t", "run", &[])
        .ret_void()
        .build();
    SceneBuilder::new()
        .class("Main", None)
        .class("Factory", None)
        .class("Task", None)
        .class("Output", None)
        .method(make)
        .method(run)
        .method(main)
        .build()
}

/// SDK stubs live under `sdk/`; their bodies are not available.
///
/// ```text
/// let w1 = Ui.create(); let w2 = Ui.create(); let n = Ui.count();
/// ```
pub fn sdk_scene() -> Scene {
    let create = MethodBuilder::static_fn("Ui", "create")
        .returns(Type::class("Widget"))
        .sdk()
        .build();
    let count = MethodBuilder::static_fn("Ui", "count")
        .returns(Type::Number)
        .sdk()
        .build();
    let main = MethodBuilder::static_fn("Main", "main")
        .call_static(Some("w1"), sig("Ui.create"), &[])
        .call_static(Some("w2"), sig("Ui.create"), &[])
        .call_static(Some("n"), sig("Ui.count"), &[])
        .ret_void()
        .build();
    SceneBuilder::new()
        .class("Main", None)
        .class_in_file("Ui", None, "sdk/ui.d.ts")
        .class_in_file("Widget", None, "sdk/ui.d.ts")
        .sdk_path("sdk/")
        .method(create)
        .method(count)
        .method(main)
        .build()
}

/// ```text
/// function helper() { return new H(); }
/// let f = helper; let r = f();
/// let g = f.bind(null); let r2 = g();
/// ```
pub fn function_pointer_scene() -> Scene {
    let helper = MethodBuilder::static_fn("Main", "helper")
        .returns(Type::class("H"))
        .new_obj("h", "H")
        .ret("h")
        .build();
    let main = MethodBuilder::static_fn("Main", "main")
        .func_ref("f", sig("Main.helper"))
        .call_ptr(Some("r"), "f", &[])
        .local("g", Type::Function(sig("Main.helper")))
        .call_virtual(Some("g"), "f", "bind", &[])
        .call_ptr(Some("r2"), "g", &[])
        .ret_void()
        .build();
    SceneBuilder::new()
        .class("Main", None)
        .class("H", None)
        .method(helper)
        .method(main)
        .build()
}

/// ```text
/// class Box { read() { return this.v; } }
///
/// let b = new Box(); b.v = new V(); let f = Box.prototype.read; let r = f.call(b);
/// ```
pub fn reflective_call_scene() -> Scene {
    let read = MethodBuilder::instance("Box", "read")
        .returns(Type::class("V"))
        .load("x", "this", "v")
        .ret("x")
        .build();
    let main = MethodBuilder::static_fn("Main", "main")
        .new_obj("b", "Box")
        .new_obj("v", "V")
        .store("b", "v", "v")
        .func_ref("f", sig("Box.read"))
        .call_virtual(Some("r"), "f", "call", &["b"])
        .ret_void()
        .build();
    SceneBuilder::new()
        .class("Main", None)
        .class("Box", None)
        .class("V", None)
        .field("Box", "v")
        .method(read)
        .method(main)
        .build()
}

/// ```text
/// class Registry { static current; }
/// function install() { Registry.current = new Service(); }
/// function lookup() { return Registry.current; }
/// install(); let s = lookup();
/// ```
pub fn static_field_scene() -> Scene {
    let install = MethodBuilder::static_fn("Main", "install")
        .new_obj("svc", "Service")
        .store_static("Registry", "current", "svc")
        .ret_void()
        .build();
    let lookup = MethodBuilder::static_fn("Main", "lookup")
        .load_static("s", "Registry", "current")
        .ret("s")
        .build();
    let main = MethodBuilder::static_fn("Main", "main")
        .call_static(None, sig("Main.install"), &[])
        .call_static(Some("s"), sig("Main.lookup"), &[])
        .ret_void()
        .build();
    SceneBuilder::new()
        .class("Main", None)
        .class("Registry", None)
        .class("Service", None)
        .method(install)
        .method(lookup)
        .method(main)
        .build()
}

/// ```text
/// let arr = new Item[]; let i = new Item(); arr[0] = i; let j = arr[1];
/// ```
pub fn array_scene() -> Scene {
    let main = MethodBuilder::static_fn("Main", "main")
        .new_array("arr", Type::class("Item"))
        .new_obj("i", "Item")
        .store_elem("arr", "i")
        .load_elem("j", "arr")
        .ret_void()
        .build();
    SceneBuilder::new()
        .class("Main", None)
        .class("Item", None)
        .method(main)
        .build()
}

/// ```text
/// let c = new Cat(); let d: Dog = c as Dog;
/// ```
pub fn type_diff_scene() -> Scene {
    let main = MethodBuilder::static_fn("Main", "main")
        .new_obj("c", "Cat")
        .local("d", Type::class("Dog"))
        .cast("d", "c", Type::class("Dog"))
        .ret_void()
        .build();
    SceneBuilder::new()
        .class("Main", None)
        .class("Animal", None)
        .class("Cat", Some("Animal"))
        .class("Dog", Some("Animal"))
        .method(main)
        .build()
}

/// Receiver-carrying call into a body without `this = this: A`
pub fn missing_this_scene() -> Scene {
    let init = MethodBuilder::instance_without_this("A", "constructor")
        .ret_void()
        .build();
    let main = MethodBuilder::static_fn("Main", "main")
        .new_obj("a", "A")
        .call_special(None, "a", sig("A.constructor"), &[])
        .ret_void()
        .build();
    SceneBuilder::new()
        .class("Main", None)
        .class("A", None)
        .method(init)
        .method(main)
        .build()
}

/// `return new A()` without an intermediate local
pub fn malformed_return_scene() -> Scene {
    let make = MethodBuilder::static_fn("Main", "make")
        .stmt(Stmt::Return(Some(Value::New {
            class: "A".to_string(),
        })))
        .build();
    let main = MethodBuilder::static_fn("Main", "main")
        .call_static(Some("a"), sig("Main.make"), &[])
        .ret_void()
        .build();
    SceneBuilder::new()
        .class("Main", None)
        .class("A", None)
        .method(make)
        .method(main)
        .build()
}

/// Static call to a method the scene does not define
pub fn absent_callee_scene() -> Scene {
    let main = MethodBuilder::static_fn("Main", "main")
        .new_obj("a", "A")
        .call_static(Some("r"), sig("Lib.absent"), &["a"])
        .ret_void()
        .build();
    SceneBuilder::new()
        .class("Main", None)
        .class("A", None)
        .class("Lib", None)
        .method(main)
        .build()
}

/// Static call into a project method declared without a body
pub fn bodiless_callee_scene() -> Scene {
    let helper = MethodBuilder::static_fn("Lib", "helper")
        .returns(Type::class("A"))
        .declaration()
        .build();
    let main = MethodBuilder::static_fn("Main", "main")
        .call_static(Some("r"), sig("Lib.helper"), &[])
        .ret_void()
        .build();
    SceneBuilder::new()
        .class("Main", None)
        .class("A", None)
        .class("Lib", None)
        .method(helper)
        .method(main)
        .build()
}

/// `o.f = new B()` without an intermediate local
pub fn unsupported_store_scene() -> Scene {
    let main = MethodBuilder::static_fn("Main", "main")
        .new_obj("o", "A")
        .stmt(Stmt::Assign {
            lhs: Value::InstanceField {
                base: Local::new("o", Type::class("A")),
                field: FieldSignature::new("A", "f"),
            },
            rhs: Value::New {
                class: "B".to_string(),
            },
        })
        .ret_void()
        .build();
    SceneBuilder::new()
        .class("Main", None)
        .class("A", None)
        .class("B", None)
        .field("A", "f")
        .method(main)
        .build()
}
