use heapless::String;

use crate::helpers::push_truncated;
use crate::{RESPONSE_MAX_LEN, UNSOLICITED_MAX_LEN};

/// Called with the accumulated text of an unsolicited response.
pub type UnsolicitedHandler = Box<dyn FnMut(&str) + Send>;

pub(crate) struct Subscription {
    pattern: String<RESPONSE_MAX_LEN>,
    line_count: u32,
    counter: u32,
    in_progress: bool,
    buffer: String<UNSOLICITED_MAX_LEN>,
    handler: UnsolicitedHandler,
}

impl Subscription {
    pub fn new(
        pattern: String<RESPONSE_MAX_LEN>,
        line_count: u32,
        handler: UnsolicitedHandler,
    ) -> Self {
        Self {
            pattern,
            line_count: line_count.max(1),
            counter: 0,
            in_progress: false,
            buffer: String::new(),
            handler,
        }
    }

    fn process(&mut self, line: &str) {
        if !self.in_progress && !line.starts_with(self.pattern.as_str()) {
            return;
        }

        push_truncated(&mut self.buffer, line);
        self.in_progress = true;

        if self.line_count - self.counter == 1 {
            debug!("Unsolicited {:?} complete", self.pattern.as_str());
            (self.handler)(self.buffer.as_str());
            self.buffer.clear();
            self.in_progress = false;
            self.counter = 0;
        } else {
            // Lines that no longer fit are still counted.
            self.buffer.push_str("\r\n").ok();
            self.counter += 1;
        }
    }
}

/// Unsolicited response subscriptions of one device.
#[derive(Default)]
pub(crate) struct UnsolicitedRegistry {
    subscriptions: Vec<(u32, Subscription)>,
}

impl UnsolicitedRegistry {
    pub fn add(&mut self, id: u32, subscription: Subscription) {
        self.subscriptions.push((id, subscription));
    }

    pub fn remove(&mut self, id: u32) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|(i, _)| *i != id);
        before != self.subscriptions.len()
    }

    /// Offer a received line to every subscription, in registration order.
    pub fn process(&mut self, line: &str) {
        for (_, subscription) in self.subscriptions.iter_mut() {
            subscription.process(line);
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn recorder(line_count: u32, pattern: &str) -> (Subscription, Arc<Mutex<Vec<std::string::String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let sub = Subscription::new(
            String::try_from(pattern).unwrap(),
            line_count,
            Box::new(move |text| sink.lock().unwrap().push(text.to_string())),
        );
        (sub, seen)
    }

    #[test]
    fn single_line() {
        let (sub, seen) = recorder(0, "+CREG:");
        let mut registry = UnsolicitedRegistry::default();
        registry.add(1, sub);

        registry.process("+CSQ: 20,99");
        registry.process("+CREG: 1");
        registry.process("+CREG: 5");
        assert_eq!(*seen.lock().unwrap(), vec!["+CREG: 1", "+CREG: 5"]);
    }

    #[test]
    fn multi_line_accumulates() {
        let (sub, seen) = recorder(2, "+CMT:");
        let mut registry = UnsolicitedRegistry::default();
        registry.add(7, sub);

        registry.process("+CMT: \"+4512345678\",,\"24/01/01,12:00:00+04\"");
        assert!(seen.lock().unwrap().is_empty());
        registry.process("Hello");
        registry.process("+CMT: \"+4587654321\"");
        registry.process("again");

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                "+CMT: \"+4512345678\",,\"24/01/01,12:00:00+04\"\r\nHello",
                "+CMT: \"+4587654321\"\r\nagain"
            ]
        );
    }

    #[test]
    fn removed_subscription_is_silent() {
        let (sub, seen) = recorder(1, "RING");
        let mut registry = UnsolicitedRegistry::default();
        registry.add(3, sub);
        assert!(registry.remove(3));
        assert!(!registry.remove(3));

        registry.process("RING");
        assert!(seen.lock().unwrap().is_empty());
    }
}
