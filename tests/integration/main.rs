mod scripted_dice;
mod simulation;
