#![cfg(test)]


mod scan {
    mod integration;
}

mod reports {
    mod integration;
}
