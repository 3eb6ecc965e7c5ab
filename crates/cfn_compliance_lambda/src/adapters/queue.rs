use std::collections::BTreeMap;

pub trait QueueTagger {
    fn tag_queue(&self, queue_url: &str, tags: &BTreeMap<String, String>) -> Result<(), String>;
}
