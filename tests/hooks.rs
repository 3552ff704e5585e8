use std::cell::{Cell, RefCell};

use decorations::{
    CallContext, DecorationError, DecorationTable, DecoratorSpec, DecoratorStyle, HookSetBuilder,
    HookedDecorator, MethodSig, Next, Outcome,
};

struct Account {
    balance: Cell<i64>,
    trail: RefCell<Vec<&'static str>>,
}

impl Account {
    fn new(balance: i64) -> Self {
        Self {
            balance: Cell::new(balance),
            trail: RefCell::new(Vec::new()),
        }
    }

    fn note(&self, event: &'static str) {
        self.trail.borrow_mut().push(event);
    }

    fn trail(&self) -> Vec<&'static str> {
        self.trail.take()
    }
}

type Withdraw = MethodSig<Account, i64, i64, String>;

fn withdraw(account: &Account, amount: &i64) -> Outcome<Withdraw> {
    account.note("withdraw");
    let left = account.balance.get() - amount;
    if left < 0 {
        return Err(format!("insufficient funds for {amount}"));
    }
    account.balance.set(left);
    Ok(left)
}

/// Two around hooks plus before/after, each noting itself.
#[derive(Default)]
struct Ledger {
    proceeds: Cell<u32>,
}

impl Ledger {
    fn open(&self, cx: &CallContext<'_, Withdraw>) -> Result<(), String> {
        cx.receiver().note("open");
        Ok(())
    }

    fn close(&self, cx: &CallContext<'_, Withdraw>) -> Result<(), String> {
        cx.receiver().note("close");
        Ok(())
    }

    fn outer(&self, next: &mut Next<'_, Withdraw>) -> Outcome<Withdraw> {
        next.receiver().note("outer:in");
        let result = next.proceed();
        self.proceeds.set(self.proceeds.get() + next.calls());
        next.receiver().note("outer:out");
        result
    }

    fn inner(&self, next: &mut Next<'_, Withdraw>) -> Outcome<Withdraw> {
        next.receiver().note("inner:in");
        let result = next.proceed();
        next.receiver().note("inner:out");
        result
    }
}

impl HookedDecorator<Withdraw> for Ledger {
    fn hooks(hooks: HookSetBuilder<Self, Withdraw>) -> HookSetBuilder<Self, Withdraw> {
        hooks
            .before()
            .def("open", Self::open)
            .around()
            .def("outer", Self::outer)
            .around()
            .def("inner", Self::inner)
            .after()
            .def("close", Self::close)
    }
}

#[test]
fn around_hooks_wrap_in_registration_order() {
    let mut class = DecorationTable::<Account>::builder();
    let method = class
        .decorate(DecoratorSpec::<Withdraw>::hooked(Ledger::default))
        .define("withdraw", withdraw)
        .unwrap();

    let account = Account::new(100);
    assert_eq!(method.call(&account, 30), Ok(70));
    assert_eq!(
        account.trail(),
        vec!["open", "outer:in", "inner:in", "withdraw", "inner:out", "outer:out", "close"]
    );
}

#[test]
fn failed_call_skips_after_hooks_but_unwinds_arounds() {
    let mut class = DecorationTable::<Account>::builder();
    let method = class
        .decorate(DecoratorSpec::<Withdraw>::hooked(Ledger::default))
        .define("withdraw", withdraw)
        .unwrap();

    let account = Account::new(10);
    assert_eq!(method.call(&account, 30), Err("insufficient funds for 30".to_string()));
    assert_eq!(
        account.trail(),
        vec!["open", "outer:in", "inner:in", "withdraw", "inner:out", "outer:out"]
    );
    assert_eq!(account.balance.get(), 10);
}

struct Frozen;

impl Frozen {
    fn refuse(&self, cx: &CallContext<'_, Withdraw>) -> Result<(), String> {
        cx.receiver().note("refuse");
        Err("account frozen".to_string())
    }

    fn never(&self, cx: &CallContext<'_, Withdraw>) -> Result<(), String> {
        cx.receiver().note("never");
        Ok(())
    }
}

impl HookedDecorator<Withdraw> for Frozen {
    fn hooks(hooks: HookSetBuilder<Self, Withdraw>) -> HookSetBuilder<Self, Withdraw> {
        hooks
            .before()
            .def("refuse", Self::refuse)
            .before()
            .def("never", Self::never)
            .after()
            .def("never_after", Self::never)
    }
}

#[test]
fn before_hook_error_aborts_the_call() {
    let mut class = DecorationTable::<Account>::builder();
    let method = class
        .decorate(DecoratorSpec::<Withdraw>::hooked(Ledger::default))
        .decorate(DecoratorSpec::hooked(|| Frozen))
        .define("withdraw", withdraw)
        .unwrap();

    let account = Account::new(100);
    assert_eq!(method.call(&account, 1), Err("account frozen".to_string()));
    assert_eq!(account.trail(), vec!["open", "outer:in", "inner:in", "refuse", "inner:out", "outer:out"]);
    assert_eq!(account.balance.get(), 100);
}

struct Veto;

impl Veto {
    fn skip(&self, next: &mut Next<'_, Withdraw>) -> Outcome<Withdraw> {
        if *next.args() > 50 {
            return Ok(next.receiver().balance.get());
        }
        next.proceed()
    }
}

impl HookedDecorator<Withdraw> for Veto {
    fn hooks(hooks: HookSetBuilder<Self, Withdraw>) -> HookSetBuilder<Self, Withdraw> {
        hooks.around().def("skip", Self::skip)
    }
}

#[test]
fn around_hook_can_short_circuit() {
    let mut class = DecorationTable::<Account>::builder();
    let method = class
        .decorate(DecoratorSpec::<Withdraw>::hooked(|| Veto))
        .define("withdraw", withdraw)
        .unwrap();

    let account = Account::new(100);
    assert_eq!(method.call(&account, 60), Ok(100));
    assert!(account.trail().is_empty());
    assert_eq!(method.call(&account, 40), Ok(60));
    assert_eq!(account.trail(), vec!["withdraw"]);
}

struct Redefined;

impl Redefined {
    fn first(&self, cx: &CallContext<'_, Withdraw>) -> Result<(), String> {
        cx.receiver().note("first");
        Ok(())
    }

    fn replacement(&self, cx: &CallContext<'_, Withdraw>) -> Result<(), String> {
        cx.receiver().note("replacement");
        Ok(())
    }

    fn second(&self, cx: &CallContext<'_, Withdraw>) -> Result<(), String> {
        cx.receiver().note("second");
        Ok(())
    }
}

impl HookedDecorator<Withdraw> for Redefined {
    fn hooks(hooks: HookSetBuilder<Self, Withdraw>) -> HookSetBuilder<Self, Withdraw> {
        hooks
            .before()
            .def("check", Self::first)
            .before()
            .def("audit", Self::second)
            .before()
            .def("check", Self::replacement)
    }
}

#[test]
fn redefining_a_hook_keeps_its_slot() {
    let spec = DecoratorSpec::<Withdraw>::hooked(|| Redefined);
    let names = spec.info().hooks().cloned().unwrap_or_default();
    assert_eq!(names.before, vec!["check", "audit"]);

    let mut class = DecorationTable::<Account>::builder();
    let method = class.decorate(spec).define("withdraw", withdraw).unwrap();

    let account = Account::new(5);
    method.call(&account, 1).unwrap();
    assert_eq!(account.trail(), vec!["replacement", "second", "withdraw"]);
}

struct Inert;

impl HookedDecorator<Withdraw> for Inert {
    fn hooks(hooks: HookSetBuilder<Self, Withdraw>) -> HookSetBuilder<Self, Withdraw> {
        hooks
    }
}

#[test]
fn decorator_without_hooks_passes_through() {
    let spec = DecoratorSpec::<Withdraw>::hooked(|| Inert);
    assert!(spec.is_pass_through());
    assert_eq!(spec.info().style(), DecoratorStyle::Hooked);

    let mut class = DecorationTable::<Account>::builder();
    let method = class.decorate(spec).define("withdraw", withdraw).unwrap();

    let account = Account::new(5);
    assert_eq!(method.call(&account, 2), Ok(3));
    assert_eq!(account.trail(), vec!["withdraw"]);
}

#[test]
fn strict_mode_rejects_decorators_without_hooks() {
    let mut class = DecorationTable::<Account>::builder();
    class.strict(true);
    let err = class
        .decorate(DecoratorSpec::<Withdraw>::hooked(|| Inert))
        .define("withdraw", withdraw)
        .unwrap_err();

    match err {
        DecorationError::EmptyDecorator { method, decorator, .. } => {
            assert_eq!(method, "withdraw");
            assert!(decorator.ends_with("Inert"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(class.build().is_empty());
}

#[test]
fn hook_state_is_fresh_for_each_call() {
    struct Counting {
        seen: Cell<u32>,
    }

    impl Counting {
        fn count(&self, cx: &CallContext<'_, Withdraw>) -> Result<(), String> {
            self.seen.set(self.seen.get() + 1);
            if self.seen.get() > 1 {
                cx.receiver().note("shared state");
            }
            Ok(())
        }
    }

    impl HookedDecorator<Withdraw> for Counting {
        fn hooks(hooks: HookSetBuilder<Self, Withdraw>) -> HookSetBuilder<Self, Withdraw> {
            hooks.before().def("count", Self::count)
        }
    }

    let mut class = DecorationTable::<Account>::builder();
    let method = class
        .decorate(DecoratorSpec::<Withdraw>::hooked(|| Counting { seen: Cell::new(0) }))
        .define("withdraw", withdraw)
        .unwrap();

    let account = Account::new(10);
    for _ in 0..3 {
        method.call(&account, 1).unwrap();
    }
    assert_eq!(account.trail(), vec!["withdraw", "withdraw", "withdraw"]);
}
